//! View models assembled from the engine's pure outputs.

use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{
    BudgetConfig, Decade, PeriodKey, Product, ProductProjection, SimError, SimulatedInstant,
    BUDGET_MONTHS,
};
use sim_econ::project_product;

/// Rows shown per page in the sales records table.
pub const SALES_PAGE_SIZE: usize = 10;
/// Rows shown per page in the pending credits table.
pub const CREDITS_PAGE_SIZE: usize = 5;

/// One 1-based page of a list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
}

/// Slice out page `page` (1-based). There is always at least one page;
/// pages outside the range are empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = items.len().div_ceil(page_size).max(1);
    let slice = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .filter(|start| *start < items.len())
        .map(|start| &items[start..(start + page_size).min(items.len())])
        .unwrap_or(&[]);
    Page {
        items: slice.to_vec(),
        page,
        total_pages,
    }
}

/// Snapshot of simulated progress, as shown on the operations dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthProgress {
    pub current_month: u32,
    pub current_decade: Decade,
    /// The simulation is in its twelfth month.
    pub is_december: bool,
    pub elapsed_minutes: i64,
}

impl Default for MonthProgress {
    fn default() -> Self {
        Self {
            current_month: 1,
            current_decade: Decade::First,
            is_december: false,
            elapsed_minutes: 0,
        }
    }
}

impl MonthProgress {
    pub fn new(instant: &SimulatedInstant, period: &PeriodKey) -> Self {
        Self {
            current_month: period.month,
            current_decade: period.decade,
            is_december: period.month == BUDGET_MONTHS,
            elapsed_minutes: instant.elapsed_minutes(),
        }
    }
}

/// Sum of all product projections for one month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MonthTotals {
    pub month: u32,
    pub total: Decimal,
    pub d1: Decimal,
    pub d2: Decimal,
    pub d3: Decimal,
}

impl MonthTotals {
    fn empty(month: u32) -> Self {
        Self {
            month,
            total: Decimal::ZERO,
            d1: Decimal::ZERO,
            d2: Decimal::ZERO,
            d3: Decimal::ZERO,
        }
    }

    fn add(&mut self, p: &ProductProjection) -> Result<(), SimError> {
        let sum = |a: Decimal, b: Decimal| a.checked_add(b).ok_or(SimError::Overflow("month total"));
        self.total = sum(self.total, p.total)?;
        self.d1 = sum(self.d1, p.d1)?;
        self.d2 = sum(self.d2, p.d2)?;
        self.d3 = sum(self.d3, p.d3)?;
        Ok(())
    }
}

/// Projections for every product and budget month, plus per-month totals.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectionTable {
    pub rows: Vec<ProductProjection>,
    pub totals: Vec<MonthTotals>,
}

impl ProjectionTable {
    pub fn month(&self, month: u32) -> impl Iterator<Item = &ProductProjection> + '_ {
        self.rows.iter().filter(move |r| r.month == month)
    }

    pub fn totals_for(&self, month: u32) -> Option<&MonthTotals> {
        self.totals.iter().find(|t| t.month == month)
    }
}

/// Project each product for `month` with the configured split.
pub fn month_projections(
    products: &[Product],
    month: u32,
    config: &BudgetConfig,
) -> Result<Vec<ProductProjection>, SimError> {
    products
        .iter()
        .map(|p| project_product(p, month, config))
        .collect()
}

/// Build the full 12-month projection table.
pub fn projection_table(products: &[Product], config: &BudgetConfig) -> Result<ProjectionTable, SimError> {
    let mut rows = Vec::with_capacity(products.len() * BUDGET_MONTHS as usize);
    let mut totals = Vec::with_capacity(BUDGET_MONTHS as usize);
    for month in 1..=BUDGET_MONTHS {
        let mut t = MonthTotals::empty(month);
        for p in month_projections(products, month, config)? {
            t.add(&p)?;
            rows.push(p);
        }
        totals.push(t);
    }
    Ok(ProjectionTable { rows, totals })
}
