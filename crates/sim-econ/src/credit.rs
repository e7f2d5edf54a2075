//! Credit aging against the simulated clock.
//!
//! Credit terms are counted in real calendar days from the moment the credit
//! was created, while "now" is the simulated date. A credit becomes
//! collectible once its term has fully elapsed.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{PendingCredit, SimError, SimulatedInstant};
use std::fmt;
use tracing::debug;

const MS_PER_DAY: i64 = 86_400_000;

/// A pending credit together with its derived due date and age.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAgingView {
    #[serde(flatten)]
    pub credit: PendingCredit,
    pub due_date: DateTime<Utc>,
    /// Whole days left in the term, rounded up. Zero or less means overdue.
    pub days_remaining: i64,
    pub is_collectible: bool,
}

impl CreditAgingView {
    pub fn status(&self) -> AgingStatus {
        if self.is_collectible {
            AgingStatus::Overdue
        } else {
            AgingStatus::Pending {
                days_remaining: self.days_remaining,
            }
        }
    }
}

/// Display status of a credit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgingStatus {
    Pending { days_remaining: i64 },
    Overdue,
}

impl fmt::Display for AgingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgingStatus::Pending { days_remaining } => write!(f, "{days_remaining} days"),
            AgingStatus::Overdue => f.write_str("overdue"),
        }
    }
}

fn ceil_div(n: i64, d: i64) -> i64 {
    let q = n / d;
    if n % d > 0 {
        q + 1
    } else {
        q
    }
}

/// Age a credit against the simulated date. Never mutates the credit.
///
/// Example:
/// created 2025-01-01, 30 days, simulated now 2025-02-05
/// => due 2025-01-31, days_remaining -5, collectible
pub fn evaluate(
    credit: &PendingCredit,
    simulated_now: &SimulatedInstant,
) -> Result<CreditAgingView, SimError> {
    let due_date = credit
        .created_at
        .checked_add_signed(Duration::days(i64::from(credit.credit_days)))
        .ok_or(SimError::DateOutOfRange)?;
    let diff_ms = due_date
        .signed_duration_since(simulated_now.simulated_date())
        .num_milliseconds();
    let days_remaining = ceil_div(diff_ms, MS_PER_DAY);
    debug!(credit = %credit.id, %due_date, days_remaining, "credit aged");
    Ok(CreditAgingView {
        credit: credit.clone(),
        due_date,
        days_remaining,
        is_collectible: days_remaining <= 0,
    })
}

/// Age every credit in `credits`, preserving order.
pub fn evaluate_all(
    credits: &[PendingCredit],
    simulated_now: &SimulatedInstant,
) -> Result<Vec<CreditAgingView>, SimError> {
    credits.iter().map(|c| evaluate(c, simulated_now)).collect()
}

/// Totals of collectible and not-yet-due credits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivablesSummary {
    pub collectible_count: usize,
    pub collectible_total: Decimal,
    pub pending_count: usize,
    pub pending_total: Decimal,
}

impl ReceivablesSummary {
    pub fn from_views(views: &[CreditAgingView]) -> Result<Self, SimError> {
        views.iter().try_fold(Self::default(), |mut s, v| {
            let cost = v.credit.total_cost;
            if v.is_collectible {
                s.collectible_count += 1;
                s.collectible_total = add_cost(s.collectible_total, cost)?;
            } else {
                s.pending_count += 1;
                s.pending_total = add_cost(s.pending_total, cost)?;
            }
            Ok(s)
        })
    }

    pub fn total(&self) -> Result<Decimal, SimError> {
        add_cost(self.collectible_total, self.pending_total)
    }
}

fn add_cost(a: Decimal, b: Decimal) -> Result<Decimal, SimError> {
    a.checked_add(b).ok_or(SimError::Overflow("receivables total"))
}
