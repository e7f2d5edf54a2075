#![deny(warnings)]

//! Adapters for externally persisted records.
//!
//! The engine owns no storage. This crate decodes the records other systems
//! hand over (the simulation origin, the budget configuration, pending
//! credits and a bundled scenario file) into validated `sim-core` types.
//! Raw wire shapes are kept private; every public function returns domain
//! values or a typed error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use sim_core::{
    decimal_from_f64, validate_budget_config, validate_credit, validate_product, BudgetConfig,
    ClientKind, CreditId, Decade, DecadeSplit, GrowthTable, PendingCredit, Product, ProductId,
    SalesRecord, SimError, SimulationOrigin,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(String),
    #[error(transparent)]
    Record(#[from] SimError),
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e.to_string())
    }
}

/// Everything a session needs, bundled in one file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scenario {
    pub origin: Option<SimulationOrigin>,
    pub products: Vec<Product>,
    pub budget: BudgetConfig,
    pub credits: Vec<PendingCredit>,
    pub sales: Vec<SalesRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    fn to_decimal(&self, field: &'static str) -> Result<Decimal, SimError> {
        match self {
            RawNumber::Int(i) => Ok(Decimal::from(*i)),
            RawNumber::Float(f) => decimal_from_f64(*f, field),
            RawNumber::Text(s) => Decimal::from_str(s.trim())
                .map_err(|e| SimError::InvalidConfig(format!("{field}: {e}"))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Int(i) => i.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// Month key written either as a number or as a numeric string.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct MonthKey(u32);

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        match RawId::deserialize(d)? {
            RawId::Int(i) => u32::try_from(i).map(MonthKey).map_err(D::Error::custom),
            RawId::Text(s) => s.trim().parse().map(MonthKey).map_err(D::Error::custom),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrigin {
    #[serde(default, alias = "started_at")]
    started_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGrowth {
    /// Index `k` holds the growth of month `k + 1`.
    List(Vec<Option<RawNumber>>),
    ByMonth(BTreeMap<MonthKey, Option<RawNumber>>),
}

#[derive(Deserialize)]
struct RawSplit {
    d1: RawNumber,
    d2: RawNumber,
    d3: RawNumber,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBudget {
    #[serde(default, alias = "growth_rates")]
    growth_rates: Option<RawGrowth>,
    #[serde(default, alias = "decade_distribution")]
    decade_distribution: Vec<RawSplit>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredit {
    id: RawId,
    #[serde(alias = "created_at")]
    created_at: String,
    #[serde(alias = "credit_days")]
    credit_days: u32,
    #[serde(alias = "total_cost")]
    total_cost: RawNumber,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCredits {
    Wrapped {
        #[serde(rename = "pendingCredits", alias = "pending_credits")]
        pending_credits: Vec<RawCredit>,
    },
    Bare(Vec<RawCredit>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProduct {
    id: RawId,
    #[serde(default)]
    name: String,
    #[serde(alias = "base_quantity", alias = "quantity")]
    base_quantity: RawNumber,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSale {
    id: RawId,
    client: String,
    kind: ClientKind,
    month: u32,
    decade: u8,
    total: RawNumber,
    #[serde(alias = "sold_at")]
    sold_at: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScenario {
    #[serde(default, alias = "started_at")]
    started_at: Option<String>,
    #[serde(default)]
    products: Vec<RawProduct>,
    budget: RawBudget,
    #[serde(default)]
    credits: Vec<RawCredit>,
    #[serde(default)]
    sales: Vec<RawSale>,
}

fn parse_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>, SimError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Timestamps without an offset are taken as UTC.
    if let Ok(ndt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ndt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(ndt) = d.and_hms_opt(0, 0, 0) {
            return Ok(ndt.and_utc());
        }
    }
    Err(SimError::InvalidConfig(format!(
        "{field}: cannot parse timestamp '{raw}'"
    )))
}

fn origin_from_raw(started_at: Option<String>) -> Result<SimulationOrigin, SimError> {
    match started_at.as_deref().map(str::trim) {
        None | Some("") => Err(SimError::MissingOrigin),
        Some(s) => Ok(SimulationOrigin::new(parse_timestamp(s, "startedAt")?)),
    }
}

fn growth_from_raw(raw: Option<RawGrowth>) -> Result<GrowthTable, SimError> {
    let mut rates = BTreeMap::new();
    match raw {
        None => {}
        Some(RawGrowth::List(items)) => {
            for (idx, item) in items.into_iter().enumerate() {
                let Some(n) = item else { continue };
                let rate = n.to_decimal("growthRates")?;
                if idx == 0 {
                    if !rate.is_zero() {
                        warn!(%rate, "ignoring growth configured for month 1");
                    }
                    continue;
                }
                let month = u32::try_from(idx + 1)
                    .map_err(|_| SimError::InvalidConfig("growthRates too long".to_string()))?;
                rates.insert(month, rate);
            }
        }
        Some(RawGrowth::ByMonth(items)) => {
            for (MonthKey(month), item) in items {
                if let Some(n) = item {
                    rates.insert(month, n.to_decimal("growthRates")?);
                }
            }
        }
    }
    GrowthTable::new(rates)
}

fn budget_from_raw(raw: RawBudget) -> Result<BudgetConfig, SimError> {
    let growth_table = growth_from_raw(raw.growth_rates)?;
    let decade_splits = raw
        .decade_distribution
        .iter()
        .map(|s| {
            Ok(DecadeSplit::new(
                s.d1.to_decimal("d1")?,
                s.d2.to_decimal("d2")?,
                s.d3.to_decimal("d3")?,
            ))
        })
        .collect::<Result<Vec<_>, SimError>>()?;
    let cfg = BudgetConfig {
        growth_table,
        decade_splits,
    };
    validate_budget_config(&cfg)?;
    Ok(cfg)
}

fn credit_from_raw(raw: RawCredit) -> Result<PendingCredit, SimError> {
    let credit = PendingCredit {
        id: CreditId(raw.id.into_string()),
        created_at: parse_timestamp(&raw.created_at, "createdAt")?,
        credit_days: raw.credit_days,
        total_cost: raw.total_cost.to_decimal("totalCost")?,
    };
    validate_credit(&credit)?;
    Ok(credit)
}

fn product_from_raw(raw: RawProduct) -> Result<Product, SimError> {
    let product = Product {
        id: ProductId(raw.id.into_string()),
        name: raw.name,
        base_quantity: raw.base_quantity.to_decimal("baseQuantity")?,
    };
    validate_product(&product)?;
    Ok(product)
}

fn sale_from_raw(raw: RawSale) -> Result<SalesRecord, SimError> {
    if raw.month == 0 {
        return Err(SimError::InvalidConfig("sale month must be >= 1".to_string()));
    }
    Ok(SalesRecord {
        id: raw.id.into_string(),
        client: raw.client,
        kind: raw.kind,
        month: raw.month,
        decade: Decade::try_from(raw.decade)?,
        total: raw.total.to_decimal("total")?,
        sold_at: parse_timestamp(&raw.sold_at, "soldAt")?,
    })
}

fn json_err(e: serde_json::Error) -> SimError {
    SimError::InvalidConfig(e.to_string())
}

/// Decode a `{ "startedAt": "<ISO-8601>" }` record.
///
/// A missing or blank timestamp is reported as [`SimError::MissingOrigin`].
pub fn parse_origin_record(json: &str) -> Result<SimulationOrigin, SimError> {
    let raw: RawOrigin = serde_json::from_str(json).map_err(json_err)?;
    origin_from_raw(raw.started_at)
}

/// Encode an origin in the record format read by [`parse_origin_record`].
pub fn origin_record(origin: &SimulationOrigin) -> Result<String, SimError> {
    serde_json::to_string(origin).map_err(json_err)
}

/// Decode a budget configuration with `growthRates` and `decadeDistribution`.
pub fn parse_budget_config(json: &str) -> Result<BudgetConfig, SimError> {
    let raw: RawBudget = serde_json::from_str(json).map_err(json_err)?;
    budget_from_raw(raw)
}

/// Decode pending credits, either wrapped in `pendingCredits` or as a bare list.
pub fn parse_pending_credits(json: &str) -> Result<Vec<PendingCredit>, SimError> {
    let raw: RawCredits = serde_json::from_str(json).map_err(json_err)?;
    let list = match raw {
        RawCredits::Wrapped { pending_credits } => pending_credits,
        RawCredits::Bare(list) => list,
    };
    list.into_iter().map(credit_from_raw).collect()
}

/// Decode a YAML scenario. A missing `startedAt` leaves the origin unset.
pub fn parse_scenario(yaml: &str) -> Result<Scenario, SimError> {
    let raw: RawScenario =
        serde_yaml::from_str(yaml).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
    let origin = match origin_from_raw(raw.started_at) {
        Ok(o) => Some(o),
        Err(SimError::MissingOrigin) => None,
        Err(e) => return Err(e),
    };
    let scenario = Scenario {
        origin,
        products: raw
            .products
            .into_iter()
            .map(product_from_raw)
            .collect::<Result<_, _>>()?,
        budget: budget_from_raw(raw.budget)?,
        credits: raw
            .credits
            .into_iter()
            .map(credit_from_raw)
            .collect::<Result<_, _>>()?,
        sales: raw
            .sales
            .into_iter()
            .map(sale_from_raw)
            .collect::<Result<_, _>>()?,
    };
    debug!(
        products = scenario.products.len(),
        credits = scenario.credits.len(),
        sales = scenario.sales.len(),
        "scenario decoded"
    );
    Ok(scenario)
}

/// Read and decode a YAML scenario file.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<Scenario, PersistenceError> {
    let text = fs::read_to_string(path.as_ref())?;
    Ok(parse_scenario(&text)?)
}
