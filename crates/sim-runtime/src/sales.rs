//! Sales-record filtering and sorting for the records view.

use serde::{Deserialize, Serialize};
use sim_core::{ClientKind, Decade, PeriodKey, SalesRecord};
use std::cmp::Ordering;

/// Filter applied to the sales records list. `None` fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesFilter {
    pub kind: Option<ClientKind>,
    /// Case-insensitive substring of the sale id or client name.
    pub search: String,
    pub month: Option<u32>,
    pub decade: Option<Decade>,
}

impl SalesFilter {
    /// Filter narrowed to one simulated period. Months past the budget
    /// horizon leave the month unfiltered.
    pub fn for_period(period: &PeriodKey) -> Self {
        Self {
            month: period.budget_month(),
            decade: Some(period.decade),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &SalesRecord) -> bool {
        if self.kind.is_some_and(|k| k != record.kind) {
            return false;
        }
        if self.month.is_some_and(|m| m != record.month) {
            return false;
        }
        if self.decade.is_some_and(|d| d != record.decade) {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        record.id.to_lowercase().contains(&needle) || record.client.to_lowercase().contains(&needle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Client,
    Total,
    SoldAt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    /// Next state when the user clicks `field`: ascending, then descending,
    /// then unsorted. Clicking a different field starts over at ascending.
    pub fn cycle(current: Option<Sort>, field: SortField) -> Option<Sort> {
        match current {
            Some(s) if s.field == field => match s.direction {
                SortDirection::Asc => Some(Sort {
                    field,
                    direction: SortDirection::Desc,
                }),
                SortDirection::Desc => None,
            },
            _ => Some(Sort {
                field,
                direction: SortDirection::Asc,
            }),
        }
    }

    fn compare(&self, a: &SalesRecord, b: &SalesRecord) -> Ordering {
        let ord = match self.field {
            SortField::Id => a.id.to_lowercase().cmp(&b.id.to_lowercase()),
            SortField::Client => a.client.to_lowercase().cmp(&b.client.to_lowercase()),
            SortField::Total => a.total.cmp(&b.total),
            SortField::SoldAt => a.sold_at.cmp(&b.sold_at),
        };
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Filter then (stably) sort the records.
pub fn select_sales(records: &[SalesRecord], filter: &SalesFilter, sort: Option<Sort>) -> Vec<SalesRecord> {
    let mut out: Vec<SalesRecord> = records.iter().filter(|r| filter.matches(r)).cloned().collect();
    if let Some(sort) = sort {
        out.sort_by(|a, b| sort.compare(a, b));
    }
    out
}

/// Months offered by the month selector, up to the current simulated month.
pub fn month_options(current_month: u32) -> Vec<u32> {
    (1..=current_month.max(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn sale(id: &str, client: &str, kind: ClientKind, month: u32, decade: Decade, total: i64) -> SalesRecord {
        SalesRecord {
            id: id.to_string(),
            client: client.to_string(),
            kind,
            month,
            decade,
            total: Decimal::new(total, 0),
            sold_at: Utc.with_ymd_and_hms(2025, 1, month, 0, 0, 0).unwrap(),
        }
    }

    fn records() -> Vec<SalesRecord> {
        vec![
            sale("A-1", "Acme Ltd", ClientKind::Company, 1, Decade::First, 300),
            sale("A-2", "Bodega Norte", ClientKind::Wholesale, 1, Decade::Second, 100),
            sale("B-7", "ana perez", ClientKind::Individual, 2, Decade::First, 200),
        ]
    }

    #[test]
    fn default_filter_matches_everything() {
        assert_eq!(select_sales(&records(), &SalesFilter::default(), None).len(), 3);
    }

    #[test]
    fn search_is_case_insensitive_on_id_and_client() {
        let f = SalesFilter {
            search: "ACME".to_string(),
            ..SalesFilter::default()
        };
        let out = select_sales(&records(), &f, None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "A-1");

        let f = SalesFilter {
            search: "a-".to_string(),
            ..SalesFilter::default()
        };
        assert_eq!(select_sales(&records(), &f, None).len(), 2);
    }

    #[test]
    fn period_and_kind_filters_combine() {
        let f = SalesFilter {
            kind: Some(ClientKind::Company),
            month: Some(1),
            decade: Some(Decade::First),
            ..SalesFilter::default()
        };
        let out = select_sales(&records(), &f, None);
        assert_eq!(out.len(), 1);

        let f = SalesFilter {
            month: Some(1),
            decade: Some(Decade::Third),
            ..SalesFilter::default()
        };
        assert!(select_sales(&records(), &f, None).is_empty());
    }

    #[test]
    fn period_past_horizon_leaves_month_open() {
        let f = SalesFilter::for_period(&PeriodKey {
            month: 14,
            decade: Decade::First,
        });
        assert_eq!(f.month, None);
        assert_eq!(select_sales(&records(), &f, None).len(), 2);
    }

    #[test]
    fn sorting_by_total_both_ways() {
        let asc = Sort {
            field: SortField::Total,
            direction: SortDirection::Asc,
        };
        let out = select_sales(&records(), &SalesFilter::default(), Some(asc));
        let ids: Vec<_> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["A-2", "B-7", "A-1"]);

        let desc = Sort::cycle(Some(asc), SortField::Total);
        let out = select_sales(&records(), &SalesFilter::default(), desc);
        assert_eq!(out[0].id, "A-1");
    }

    #[test]
    fn sort_cycle_goes_asc_desc_none() {
        let s = Sort::cycle(None, SortField::Client);
        assert_eq!(s.map(|s| s.direction), Some(SortDirection::Asc));
        let s = Sort::cycle(s, SortField::Client);
        assert_eq!(s.map(|s| s.direction), Some(SortDirection::Desc));
        assert_eq!(Sort::cycle(s, SortField::Client), None);
        let other = Sort::cycle(s, SortField::Id);
        assert_eq!(other.map(|s| s.field), Some(SortField::Id));
    }

    #[test]
    fn client_sort_ignores_case() {
        let asc = Sort {
            field: SortField::Client,
            direction: SortDirection::Asc,
        };
        let out = select_sales(&records(), &SalesFilter::default(), Some(asc));
        assert_eq!(out[0].client, "Acme Ltd");
        assert_eq!(out[1].client, "ana perez");
    }

    #[test]
    fn month_options_run_to_current_month() {
        assert_eq!(month_options(3), vec![1, 2, 3]);
        assert_eq!(month_options(0), vec![1]);
    }
}
