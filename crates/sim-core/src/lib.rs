#![deny(warnings)]

//! Core domain model for the simulated-period engine.
//!
//! This crate defines the serializable types shared by every other crate
//! (simulation origin, period keys, budget configuration, credits and sales
//! records), the error taxonomy, and the simulated clock with its period
//! resolver. Everything here is pure: callers pass inputs in explicitly and
//! get derived values back.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

mod clock;

pub use clock::{
    current_period, resolve, simulated_now, SimulatedInstant, DECADES_PER_MONTH,
    MINUTES_PER_DECADE, SIMULATED_MINUTES_PER_MONTH,
};

/// Number of months covered by a budget horizon.
pub const BUDGET_MONTHS: u32 = 12;

/// The real-world instant a simulation began. Immutable once set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOrigin {
    /// Real start timestamp.
    pub started_at: DateTime<Utc>,
}

impl SimulationOrigin {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self { started_at }
    }
}

/// One third of a simulated month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Decade {
    First,
    Second,
    Third,
}

impl Decade {
    /// All decades in calendar order.
    pub const ALL: [Decade; 3] = [Decade::First, Decade::Second, Decade::Third];

    /// 1-based position within the month.
    pub fn number(self) -> u8 {
        match self {
            Decade::First => 1,
            Decade::Second => 2,
            Decade::Third => 3,
        }
    }
}

impl TryFrom<u8> for Decade {
    type Error = SimError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Decade::First),
            2 => Ok(Decade::Second),
            3 => Ok(Decade::Third),
            other => Err(SimError::DecadeOutOfRange(other)),
        }
    }
}

impl From<Decade> for u8 {
    fn from(d: Decade) -> Self {
        d.number()
    }
}

impl fmt::Display for Decade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Simulated month (1-based, unbounded) and decade within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    pub month: u32,
    pub decade: Decade,
}

impl PeriodKey {
    /// Month as a budget index, or `None` once the simulation has run past the
    /// budget horizon. Views treat `None` as "all months".
    pub fn budget_month(&self) -> Option<u32> {
        (1..=BUDGET_MONTHS).contains(&self.month).then_some(self.month)
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "month {} / decade {}", self.month, self.decade)
    }
}

/// Growth percentages keyed by month (2..=12), each relative to month 1.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<u32, Decimal>", into = "BTreeMap<u32, Decimal>")]
pub struct GrowthTable {
    rates: BTreeMap<u32, Decimal>,
}

impl GrowthTable {
    /// Build a table, rejecting entries outside months 2..=12.
    pub fn new(rates: BTreeMap<u32, Decimal>) -> Result<Self, SimError> {
        if let Some(&month) = rates.keys().find(|m| !(2..=BUDGET_MONTHS).contains(*m)) {
            return Err(SimError::GrowthMonthOutOfRange(month));
        }
        Ok(Self { rates })
    }

    /// Growth configured for `month`; missing entries count as zero.
    pub fn rate(&self, month: u32) -> Decimal {
        self.rates.get(&month).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Decimal)> + '_ {
        self.rates.iter().map(|(m, r)| (*m, *r))
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl TryFrom<BTreeMap<u32, Decimal>> for GrowthTable {
    type Error = SimError;

    fn try_from(rates: BTreeMap<u32, Decimal>) -> Result<Self, Self::Error> {
        GrowthTable::new(rates)
    }
}

impl From<GrowthTable> for BTreeMap<u32, Decimal> {
    fn from(t: GrowthTable) -> Self {
        t.rates
    }
}

/// Percentage split of a monthly total across its three decades.
///
/// The split is trusted as given: shares are not required to sum to 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecadeSplit {
    pub d1: Decimal,
    pub d2: Decimal,
    pub d3: Decimal,
}

impl DecadeSplit {
    pub fn new(d1: Decimal, d2: Decimal, d3: Decimal) -> Self {
        Self { d1, d2, d3 }
    }

    pub fn share(&self, decade: Decade) -> Decimal {
        match decade {
            Decade::First => self.d1,
            Decade::Second => self.d2,
            Decade::Third => self.d3,
        }
    }

    pub fn sum(&self) -> Decimal {
        self.d1 + self.d2 + self.d3
    }
}

/// Budget configuration supplied once per session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Growth per month relative to month 1.
    pub growth_table: GrowthTable,
    /// One split per budget month, month 1 first.
    pub decade_splits: Vec<DecadeSplit>,
}

impl BudgetConfig {
    /// Split configured for `month` (1-based).
    pub fn split_for(&self, month: u32) -> Result<&DecadeSplit, SimError> {
        month
            .checked_sub(1)
            .and_then(|i| self.decade_splits.get(i as usize))
            .ok_or(SimError::MissingDecadeSplit(month))
    }
}

/// Unique product identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A budgeted product with its month-1 quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Quantity entered for month 1 (>= 0).
    pub base_quantity: Decimal,
}

/// Projected quantity of one product for one month, split by decade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductProjection {
    pub product_id: ProductId,
    pub month: u32,
    pub total: Decimal,
    pub d1: Decimal,
    pub d2: Decimal,
    pub d3: Decimal,
}

/// Identifier of a credit operation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreditId(pub String);

impl fmt::Display for CreditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A credit sale waiting to be collected. Read-only to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCredit {
    pub id: CreditId,
    pub created_at: DateTime<Utc>,
    /// Term in real days.
    pub credit_days: u32,
    pub total_cost: Decimal,
}

/// Customer category of a sale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    Company,
    Wholesale,
    Individual,
}

/// A recorded sale tagged with the simulated period it happened in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub id: String,
    pub client: String,
    pub kind: ClientKind,
    pub month: u32,
    pub decade: Decade,
    pub total: Decimal,
    pub sold_at: DateTime<Utc>,
}

/// Broad failure categories surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed origin, growth table or decade split. Not retried.
    Configuration,
    /// Out-of-range or non-finite input. Fails fast, never clamped.
    InvalidInput,
}

/// Errors produced by the engine.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// No simulation origin has been set.
    #[error("simulation origin is not initialized")]
    MissingOrigin,
    /// A simulated instant was resolved against a different origin.
    #[error("simulated instant was derived from a different origin")]
    OriginMismatch,
    /// Malformed externally supplied configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Growth entries are only meaningful for months 2..=12.
    #[error("growth rate configured for month {0}; only months 2..=12 are allowed")]
    GrowthMonthOutOfRange(u32),
    /// No decade split for the requested month.
    #[error("no decade split configured for month {0}")]
    MissingDecadeSplit(u32),
    /// Real time precedes the simulation origin.
    #[error("real time {real_now} precedes simulation origin {started_at}")]
    NegativeElapsed {
        started_at: DateTime<Utc>,
        real_now: DateTime<Utc>,
    },
    /// Numeric field must be finite.
    #[error("non-finite numeric value for {0}")]
    NonFinite(&'static str),
    /// Month outside the budget horizon.
    #[error("month {0} is outside [1, 12]")]
    MonthOutOfRange(u32),
    /// Decade outside 1..=3.
    #[error("decade {0} is outside [1, 3]")]
    DecadeOutOfRange(u8),
    /// Quantity or money must be non-negative.
    #[error("negative value for {0}")]
    Negative(&'static str),
    /// Calendar arithmetic left the representable range.
    #[error("date arithmetic out of range")]
    DateOutOfRange,
    /// Decimal arithmetic overflowed.
    #[error("numeric overflow computing {0}")]
    Overflow(&'static str),
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::MissingOrigin
            | SimError::OriginMismatch
            | SimError::InvalidConfig(_)
            | SimError::GrowthMonthOutOfRange(_)
            | SimError::MissingDecadeSplit(_) => ErrorKind::Configuration,
            SimError::NegativeElapsed { .. }
            | SimError::NonFinite(_)
            | SimError::MonthOutOfRange(_)
            | SimError::DecadeOutOfRange(_)
            | SimError::Negative(_)
            | SimError::DateOutOfRange
            | SimError::Overflow(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Round to whole units, halves away from zero. The single rounding policy
/// used for every projected or distributed quantity.
pub fn round_units(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a float coming from an external record into a decimal.
pub fn decimal_from_f64(value: f64, field: &'static str) -> Result<Decimal, SimError> {
    if !value.is_finite() {
        return Err(SimError::NonFinite(field));
    }
    Decimal::from_f64(value).ok_or(SimError::NonFinite(field))
}

/// Check that a month lies within the budget horizon.
pub fn validate_budget_month(month: u32) -> Result<u32, SimError> {
    if (1..=BUDGET_MONTHS).contains(&month) {
        Ok(month)
    } else {
        Err(SimError::MonthOutOfRange(month))
    }
}

/// Validate a product.
pub fn validate_product(p: &Product) -> Result<(), SimError> {
    if p.id.0.trim().is_empty() {
        return Err(SimError::InvalidConfig("product id is empty".to_string()));
    }
    if p.base_quantity < Decimal::ZERO {
        return Err(SimError::Negative("base_quantity"));
    }
    Ok(())
}

/// Validate a pending credit record.
pub fn validate_credit(c: &PendingCredit) -> Result<(), SimError> {
    if c.id.0.trim().is_empty() {
        return Err(SimError::InvalidConfig("credit id is empty".to_string()));
    }
    if c.total_cost < Decimal::ZERO {
        return Err(SimError::Negative("total_cost"));
    }
    Ok(())
}

/// Validate a budget configuration: one split per budget month.
pub fn validate_budget_config(cfg: &BudgetConfig) -> Result<(), SimError> {
    if cfg.decade_splits.len() != BUDGET_MONTHS as usize {
        return Err(SimError::InvalidConfig(format!(
            "expected {} decade splits, found {}",
            BUDGET_MONTHS,
            cfg.decade_splits.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn splits() -> Vec<DecadeSplit> {
        (0..12)
            .map(|_| DecadeSplit::new(Decimal::new(40, 0), Decimal::new(35, 0), Decimal::new(25, 0)))
            .collect()
    }

    #[test]
    fn growth_table_rejects_month_one_and_thirteen() {
        let mut rates = BTreeMap::new();
        rates.insert(1, Decimal::new(5, 0));
        assert_eq!(GrowthTable::new(rates), Err(SimError::GrowthMonthOutOfRange(1)));

        let mut rates = BTreeMap::new();
        rates.insert(13, Decimal::new(5, 0));
        assert_eq!(GrowthTable::new(rates), Err(SimError::GrowthMonthOutOfRange(13)));
    }

    #[test]
    fn growth_table_missing_month_is_zero() {
        let mut rates = BTreeMap::new();
        rates.insert(2, Decimal::new(10, 0));
        let t = GrowthTable::new(rates).unwrap();
        assert_eq!(t.rate(2), Decimal::new(10, 0));
        assert_eq!(t.rate(7), Decimal::ZERO);
    }

    #[test]
    fn growth_table_serde_uses_month_keys() {
        let t: GrowthTable = serde_json::from_str(r#"{"2": "10", "3": -5}"#).unwrap();
        assert_eq!(t.rate(2), Decimal::new(10, 0));
        assert_eq!(t.rate(3), Decimal::new(-5, 0));
        assert!(serde_json::from_str::<GrowthTable>(r#"{"14": 1}"#).is_err());
    }

    #[test]
    fn split_lookup_is_one_based() {
        let mut cfg = BudgetConfig {
            growth_table: GrowthTable::default(),
            decade_splits: splits(),
        };
        cfg.decade_splits[0] = DecadeSplit::new(Decimal::ONE_HUNDRED, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(cfg.split_for(1).unwrap().d1, Decimal::ONE_HUNDRED);
        assert_eq!(cfg.split_for(0), Err(SimError::MissingDecadeSplit(0)));
        assert_eq!(cfg.split_for(13), Err(SimError::MissingDecadeSplit(13)));
        validate_budget_config(&cfg).unwrap();

        cfg.decade_splits.pop();
        assert!(matches!(
            validate_budget_config(&cfg),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn decade_serde_is_numeric() {
        assert_eq!(serde_json::to_string(&Decade::Second).unwrap(), "2");
        let d: Decade = serde_json::from_str("3").unwrap();
        assert_eq!(d, Decade::Third);
        assert!(serde_json::from_str::<Decade>("4").is_err());
    }

    #[test]
    fn budget_month_hides_months_past_horizon() {
        let k = PeriodKey { month: 12, decade: Decade::Third };
        assert_eq!(k.budget_month(), Some(12));
        let k = PeriodKey { month: 13, decade: Decade::First };
        assert_eq!(k.budget_month(), None);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(SimError::MissingOrigin.kind(), ErrorKind::Configuration);
        assert_eq!(SimError::MissingDecadeSplit(4).kind(), ErrorKind::Configuration);
        assert_eq!(SimError::MonthOutOfRange(13).kind(), ErrorKind::InvalidInput);
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let e = SimError::NegativeElapsed { started_at: t, real_now: t };
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_units(Decimal::new(33125, 1)), Decimal::new(3313, 0));
        assert_eq!(round_units(Decimal::new(-25, 1)), Decimal::new(-3, 0));
        assert_eq!(round_units(Decimal::new(82825, 2)), Decimal::new(828, 0));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        assert_eq!(decimal_from_f64(f64::NAN, "qty"), Err(SimError::NonFinite("qty")));
        assert_eq!(
            decimal_from_f64(f64::INFINITY, "qty"),
            Err(SimError::NonFinite("qty"))
        );
        assert_eq!(decimal_from_f64(2.5, "qty").unwrap(), Decimal::new(25, 1));
    }

    #[test]
    fn product_and_credit_validation() {
        let p = Product {
            id: ProductId("alfa".to_string()),
            name: "Alfa".to_string(),
            base_quantity: Decimal::new(-1, 0),
        };
        assert_eq!(validate_product(&p), Err(SimError::Negative("base_quantity")));

        let c = PendingCredit {
            id: CreditId(" ".to_string()),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            credit_days: 30,
            total_cost: Decimal::new(100, 0),
        };
        assert!(matches!(validate_credit(&c), Err(SimError::InvalidConfig(_))));
    }

    proptest! {
        #[test]
        fn decade_roundtrips_through_number(n in 1u8..=3) {
            let d = Decade::try_from(n).unwrap();
            prop_assert_eq!(d.number(), n);
        }

        #[test]
        fn only_horizon_months_validate(m in 0u32..40) {
            prop_assert_eq!(validate_budget_month(m).is_ok(), (1..=12).contains(&m));
        }
    }
}
