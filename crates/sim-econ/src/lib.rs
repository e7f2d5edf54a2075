#![deny(warnings)]

//! Budget economics: sales projection, decade distribution and credit aging.
//!
//! This crate provides pure helpers for:
//! - Projecting a product's monthly quantity from its month-1 base
//! - Splitting a monthly total across the three decades of the month
//! - Aging pending credits against the simulated clock
//! - Dashboard probability factors derived from sales policy inputs
//!
//! Every quantity is rounded with [`sim_core::round_units`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    round_units, validate_budget_month, BudgetConfig, Decade, DecadeSplit, GrowthTable,
    Product, ProductProjection, SimError,
};
use tracing::debug;

pub mod credit;
pub mod factors;

pub use credit::{evaluate, evaluate_all, AgingStatus, CreditAgingView, ReceivablesSummary};

/// A monthly total split across its decades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecadeBreakdown {
    pub d1: Decimal,
    pub d2: Decimal,
    pub d3: Decimal,
    /// The undivided monthly total.
    pub total: Decimal,
}

impl DecadeBreakdown {
    pub fn get(&self, decade: Decade) -> Decimal {
        match decade {
            Decade::First => self.d1,
            Decade::Second => self.d2,
            Decade::Third => self.d3,
        }
    }

    /// Sum of the three shares. May differ from `total` by up to 2 units.
    pub fn shares_sum(&self) -> Decimal {
        self.d1 + self.d2 + self.d3
    }
}

/// Sum of growth percentages for months 2..=`month`, relative to month 1.
///
/// Returns zero for month 1.
pub fn accumulated_growth(month: u32, table: &GrowthTable) -> Result<Decimal, SimError> {
    let month = validate_budget_month(month)?;
    (2..=month).try_fold(Decimal::ZERO, |acc, m| {
        acc.checked_add(table.rate(m))
            .ok_or(SimError::Overflow("accumulated growth"))
    })
}

/// Project a month-1 quantity onto `month` (1..=12).
///
/// Growth is additive: month N is `base * (100 + Σ growth[2..=N]) / 100`,
/// rounded half away from zero. Month 1 returns `base` untouched.
///
/// Example:
/// let mut rates = BTreeMap::new();
/// rates.insert(2, Decimal::new(10, 0));
/// rates.insert(3, Decimal::new(15, 0));
/// let table = GrowthTable::new(rates).unwrap();
/// assert_eq!(project(Decimal::new(2650, 0), 3, &table).unwrap(), Decimal::new(3313, 0));
pub fn project(base: Decimal, month: u32, table: &GrowthTable) -> Result<Decimal, SimError> {
    let growth = accumulated_growth(month, table)?;
    if month == 1 {
        return Ok(base);
    }
    let cumulative = Decimal::ONE_HUNDRED
        .checked_add(growth)
        .ok_or(SimError::Overflow("projected quantity"))?;
    let scaled = base
        .checked_mul(cumulative)
        .ok_or(SimError::Overflow("projected quantity"))?;
    let projected = round_units(scaled / Decimal::ONE_HUNDRED);
    debug!(%base, month, %cumulative, %projected, "projected quantity");
    Ok(projected)
}

/// Split `total` across decades. Each share is rounded on its own, with no
/// remainder correction, and the split is not checked to sum to 100.
pub fn distribute(total: Decimal, split: &DecadeSplit) -> Result<DecadeBreakdown, SimError> {
    let share = |pct: Decimal| -> Result<Decimal, SimError> {
        let scaled = total
            .checked_mul(pct)
            .ok_or(SimError::Overflow("decade share"))?;
        Ok(round_units(scaled / Decimal::ONE_HUNDRED))
    };
    Ok(DecadeBreakdown {
        d1: share(split.d1)?,
        d2: share(split.d2)?,
        d3: share(split.d3)?,
        total,
    })
}

/// Projection of one product for one month using the configured split.
pub fn project_product(
    product: &Product,
    month: u32,
    config: &BudgetConfig,
) -> Result<ProductProjection, SimError> {
    let total = project(product.base_quantity, month, &config.growth_table)?;
    let split = config.split_for(month)?;
    let b = distribute(total, split)?;
    Ok(ProductProjection {
        product_id: product.id.clone(),
        month,
        total: b.total,
        d1: b.d1,
        d2: b.d2,
        d3: b.d3,
    })
}
