#![deny(warnings)]

//! Session runtime: the caller-side adapter around the pure engine.
//!
//! A [`Session`] owns the most recently delivered inputs (origin, budget
//! configuration, products, credits and sales) and assembles views from
//! them. It never caches derived values: every view call reads the clock
//! again and recomputes. Updates arrive as [`RefreshEvent`]s, either applied
//! directly or drained from a bounded channel fed by the transport layer.

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use persistence::Scenario;
use sim_core::{
    current_period, BudgetConfig, CreditId, PendingCredit, PeriodKey, Product, ProductProjection,
    SalesRecord, SimError, SimulatedInstant, SimulationOrigin,
};
use sim_econ::{evaluate_all, CreditAgingView, ReceivablesSummary};
use tracing::{debug, info, warn};

pub mod sales;
pub mod views;

pub use sales::{month_options, select_sales, SalesFilter, Sort, SortDirection, SortField};
pub use views::{
    paginate, projection_table, MonthProgress, MonthTotals, Page, ProjectionTable,
    CREDITS_PAGE_SIZE, SALES_PAGE_SIZE,
};

/// Fresh input delivered by an external collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum RefreshEvent {
    Origin(SimulationOrigin),
    Budget(BudgetConfig),
    Products(Vec<Product>),
    Credits(Vec<PendingCredit>),
    /// The remote "mark as paid" call succeeded for this credit.
    CreditPaid(CreditId),
    Sales(Vec<SalesRecord>),
}

/// Bounded channel used to deliver refresh events to a session.
pub fn refresh_channel(capacity: usize) -> (Sender<RefreshEvent>, Receiver<RefreshEvent>) {
    bounded(capacity)
}

/// Latest inputs of one user session.
#[derive(Clone, Debug, Default)]
pub struct Session {
    origin: Option<SimulationOrigin>,
    budget: BudgetConfig,
    products: Vec<Product>,
    credits: Vec<PendingCredit>,
    sales: Vec<SalesRecord>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scenario(scenario: Scenario) -> Self {
        info!(
            has_origin = scenario.origin.is_some(),
            products = scenario.products.len(),
            credits = scenario.credits.len(),
            "session loaded from scenario"
        );
        Self {
            origin: scenario.origin,
            budget: scenario.budget,
            products: scenario.products,
            credits: scenario.credits,
            sales: scenario.sales,
        }
    }

    pub fn origin(&self) -> Option<&SimulationOrigin> {
        self.origin.as_ref()
    }

    pub fn credits(&self) -> &[PendingCredit] {
        &self.credits
    }

    /// Replace the matching input with the event's payload.
    pub fn apply(&mut self, event: RefreshEvent) {
        match event {
            RefreshEvent::Origin(o) => {
                info!(started_at = %o.started_at, "simulation origin set");
                self.origin = Some(o);
            }
            RefreshEvent::Budget(b) => self.budget = b,
            RefreshEvent::Products(p) => self.products = p,
            RefreshEvent::Credits(c) => self.credits = c,
            RefreshEvent::CreditPaid(id) => {
                let before = self.credits.len();
                self.credits.retain(|c| c.id != id);
                if self.credits.len() == before {
                    warn!(credit = %id, "paid credit was not pending");
                }
            }
            RefreshEvent::Sales(s) => self.sales = s,
        }
    }

    /// Apply every event currently queued on `rx` without blocking.
    pub fn drain(&mut self, rx: &Receiver<RefreshEvent>) -> usize {
        let mut n = 0;
        for event in rx.try_iter() {
            self.apply(event);
            n += 1;
        }
        if n > 0 {
            debug!(events = n, "refresh events applied");
        }
        n
    }

    /// Read the simulated clock and resolve the current period.
    pub fn clock(&self, real_now: DateTime<Utc>) -> Result<(SimulatedInstant, PeriodKey), SimError> {
        current_period(self.origin.as_ref(), real_now)
    }

    /// Current progress. Without an origin the session falls back to month 1,
    /// decade 1; every other error is returned.
    pub fn month_progress(&self, real_now: DateTime<Utc>) -> Result<MonthProgress, SimError> {
        match self.clock(real_now) {
            Ok((instant, period)) => Ok(MonthProgress::new(&instant, &period)),
            Err(SimError::MissingOrigin) => {
                warn!("no simulation origin; showing first period");
                Ok(MonthProgress::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Months offered by the records view's month selector.
    pub fn month_options(&self, real_now: DateTime<Utc>) -> Result<Vec<u32>, SimError> {
        Ok(month_options(self.month_progress(real_now)?.current_month))
    }

    pub fn projection_table(&self) -> Result<ProjectionTable, SimError> {
        projection_table(&self.products, &self.budget)
    }

    pub fn month_projections(&self, month: u32) -> Result<Vec<ProductProjection>, SimError> {
        views::month_projections(&self.products, month, &self.budget)
    }

    /// Age every pending credit against the current simulated date.
    pub fn aged_credits(&self, real_now: DateTime<Utc>) -> Result<Vec<CreditAgingView>, SimError> {
        let (instant, _) = self.clock(real_now)?;
        evaluate_all(&self.credits, &instant)
    }

    pub fn pending_credits(
        &self,
        real_now: DateTime<Utc>,
        page: usize,
    ) -> Result<Page<CreditAgingView>, SimError> {
        Ok(paginate(&self.aged_credits(real_now)?, page, CREDITS_PAGE_SIZE))
    }

    pub fn receivables(&self, real_now: DateTime<Utc>) -> Result<ReceivablesSummary, SimError> {
        ReceivablesSummary::from_views(&self.aged_credits(real_now)?)
    }

    pub fn sales_records(&self, filter: &SalesFilter, sort: Option<Sort>, page: usize) -> Page<SalesRecord> {
        paginate(&select_sales(&self.sales, filter, sort), page, SALES_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use sim_core::{ClientKind, Decade, DecadeSplit, ProductId};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn credit(id: &str, days: u32) -> PendingCredit {
        PendingCredit {
            id: CreditId(id.to_string()),
            created_at: t0(),
            credit_days: days,
            total_cost: Decimal::new(100, 0),
        }
    }

    fn sale(id: &str, month: u32, decade: Decade) -> SalesRecord {
        SalesRecord {
            id: id.to_string(),
            client: "Client".to_string(),
            kind: ClientKind::Individual,
            month,
            decade,
            total: Decimal::new(10, 0),
            sold_at: t0(),
        }
    }

    fn session() -> Session {
        let mut s = Session::new();
        s.apply(RefreshEvent::Origin(SimulationOrigin::new(t0())));
        s.apply(RefreshEvent::Budget(BudgetConfig {
            growth_table: Default::default(),
            decade_splits: vec![
                DecadeSplit::new(Decimal::new(40, 0), Decimal::new(35, 0), Decimal::new(25, 0));
                12
            ],
        }));
        s.apply(RefreshEvent::Products(vec![Product {
            id: ProductId("alfaros".to_string()),
            name: "Alfaros".to_string(),
            base_quantity: Decimal::new(2650, 0),
        }]));
        s
    }

    #[test]
    fn progress_falls_back_without_origin() {
        let s = Session::new();
        assert_eq!(s.month_progress(t0()).unwrap(), MonthProgress::default());
        assert!(matches!(s.clock(t0()), Err(SimError::MissingOrigin)));
        assert!(s.aged_credits(t0()).is_err());
    }

    #[test]
    fn progress_tracks_real_time() {
        let s = session();
        let now = t0() + Duration::weeks(11) + Duration::days(5);
        let p = s.month_progress(now).unwrap();
        assert_eq!(p.current_month, 12);
        assert_eq!(p.current_decade, Decade::Third);
        assert!(p.is_december);
        assert_eq!(p.elapsed_minutes, (11 * 7 + 5) * 24 * 60);
        assert_eq!(s.month_options(now).unwrap().len(), 12);
    }

    #[test]
    fn clock_skew_is_not_hidden_by_fallback() {
        let s = session();
        let err = s.month_progress(t0() - Duration::minutes(1)).unwrap_err();
        assert!(matches!(err, SimError::NegativeElapsed { .. }));
    }

    #[test]
    fn credits_refresh_and_paid_removal() {
        let (tx, rx) = refresh_channel(8);
        let mut s = session();
        tx.send(RefreshEvent::Credits(vec![credit("1", 7), credit("2", 90)]))
            .unwrap();
        tx.send(RefreshEvent::CreditPaid(CreditId("2".to_string())))
            .unwrap();
        assert_eq!(s.drain(&rx), 2);
        assert_eq!(s.credits().len(), 1);
        assert_eq!(s.drain(&rx), 0);

        // one real week later the simulated date is 2025-02-01
        let page = s.pending_credits(t0() + Duration::weeks(1), 1).unwrap();
        assert_eq!(page.total_pages, 1);
        assert!(page.items[0].is_collectible);
        assert_eq!(page.items[0].days_remaining, -24);
    }

    #[test]
    fn pending_credits_paginate_by_five() {
        let mut s = session();
        let credits = (0..7).map(|i| credit(&i.to_string(), 30)).collect();
        s.apply(RefreshEvent::Credits(credits));
        let now = t0() + Duration::days(1);
        let first = s.pending_credits(now, 1).unwrap();
        assert_eq!(first.items.len(), 5);
        assert_eq!(first.total_pages, 2);
        assert_eq!(s.pending_credits(now, 2).unwrap().items.len(), 2);

        let summary = s.receivables(now).unwrap();
        assert_eq!(summary.pending_count, 7);
        assert_eq!(summary.pending_total, Decimal::new(700, 0));
    }

    #[test]
    fn sales_are_filtered_for_the_current_period() {
        let mut s = session();
        s.apply(RefreshEvent::Sales(vec![
            sale("1", 1, Decade::First),
            sale("2", 2, Decade::Second),
            sale("3", 2, Decade::Second),
        ]));
        let now = t0() + Duration::weeks(1) + Duration::days(3);
        let (_, period) = s.clock(now).unwrap();
        let page = s.sales_records(&SalesFilter::for_period(&period), None, 1);
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|r| r.month == 2));
    }

    #[test]
    fn projections_follow_latest_budget() {
        let mut s = session();
        assert_eq!(s.month_projections(1).unwrap()[0].d1, Decimal::new(1060, 0));
        let budget = BudgetConfig {
            growth_table: Default::default(),
            decade_splits: vec![
                DecadeSplit::new(Decimal::ONE_HUNDRED, Decimal::ZERO, Decimal::ZERO);
                12
            ],
        };
        s.apply(RefreshEvent::Budget(budget));
        assert_eq!(s.month_projections(1).unwrap()[0].d1, Decimal::new(2650, 0));
        assert_eq!(s.projection_table().unwrap().rows.len(), 12);
    }
}
