//! Simulated clock and period resolver.
//!
//! One real week maps to one simulated month. The simulated date advances in
//! whole months only: day-of-month and time-of-day always come from the origin.

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;
use tracing::debug;

use crate::{Decade, PeriodKey, SimError, SimulationOrigin};

/// Real minutes that make up one simulated month (7 days × 24 h × 60 min).
pub const SIMULATED_MINUTES_PER_MONTH: i64 = 10_080;
/// Decades in a simulated month.
pub const DECADES_PER_MONTH: i64 = 3;
/// Real minutes that make up one decade.
pub const MINUTES_PER_DECADE: i64 = SIMULATED_MINUTES_PER_MONTH / DECADES_PER_MONTH;

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_MONTH: i64 = SIMULATED_MINUTES_PER_MONTH * MS_PER_MINUTE;
const MS_PER_DECADE: i64 = MS_PER_MONTH / DECADES_PER_MONTH;

/// A reading of the simulated clock. Derived on every query, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SimulatedInstant {
    simulated_date: DateTime<Utc>,
    origin: SimulationOrigin,
    months_elapsed: u32,
    elapsed_ms: i64,
}

impl SimulatedInstant {
    /// The simulated calendar date.
    pub fn simulated_date(&self) -> DateTime<Utc> {
        self.simulated_date
    }

    /// Origin this reading was derived from.
    pub fn origin(&self) -> &SimulationOrigin {
        &self.origin
    }

    /// Whole simulated months since the origin.
    pub fn months_elapsed(&self) -> u32 {
        self.months_elapsed
    }

    /// Real time elapsed since the origin.
    pub fn elapsed(&self) -> Duration {
        Duration::milliseconds(self.elapsed_ms)
    }

    /// Whole real minutes elapsed since the origin.
    pub fn elapsed_minutes(&self) -> i64 {
        self.elapsed_ms / MS_PER_MINUTE
    }
}

/// Read the simulated clock.
///
/// Fails with a configuration error when no origin is set and with an
/// invalid-input error when `real_now` precedes the origin.
pub fn simulated_now(
    origin: Option<&SimulationOrigin>,
    real_now: DateTime<Utc>,
) -> Result<SimulatedInstant, SimError> {
    let origin = origin.ok_or(SimError::MissingOrigin)?;
    if real_now < origin.started_at {
        return Err(SimError::NegativeElapsed {
            started_at: origin.started_at,
            real_now,
        });
    }
    let elapsed_ms = real_now
        .signed_duration_since(origin.started_at)
        .num_milliseconds();
    let months_elapsed =
        u32::try_from(elapsed_ms / MS_PER_MONTH).map_err(|_| SimError::DateOutOfRange)?;
    // Calendar month step; the day is clamped to the end of shorter months.
    let simulated_date = origin
        .started_at
        .checked_add_months(Months::new(months_elapsed))
        .ok_or(SimError::DateOutOfRange)?;
    debug!(%simulated_date, months_elapsed, elapsed_ms, "simulated clock read");
    Ok(SimulatedInstant {
        simulated_date,
        origin: *origin,
        months_elapsed,
        elapsed_ms,
    })
}

/// Derive the simulated month and decade of a clock reading.
///
/// The month is not clamped to the budget horizon; see [`PeriodKey::budget_month`].
pub fn resolve(instant: &SimulatedInstant, origin: &SimulationOrigin) -> Result<PeriodKey, SimError> {
    if instant.origin != *origin {
        return Err(SimError::OriginMismatch);
    }
    let month = instant
        .months_elapsed
        .checked_add(1)
        .ok_or(SimError::DateOutOfRange)?;
    let remainder = instant.elapsed_ms % MS_PER_MONTH;
    let index = (remainder / MS_PER_DECADE + 1).clamp(1, DECADES_PER_MONTH);
    // index is within 1..=3 after the clamp
    let decade = Decade::try_from(index as u8)?;
    Ok(PeriodKey { month, decade })
}

/// Read the clock and resolve the period in one step.
pub fn current_period(
    origin: Option<&SimulationOrigin>,
    real_now: DateTime<Utc>,
) -> Result<(SimulatedInstant, PeriodKey), SimError> {
    let instant = simulated_now(origin, real_now)?;
    let period = resolve(&instant, instant.origin())?;
    Ok((instant, period))
}
