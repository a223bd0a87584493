//! # Financial Period Aggregator
//!
//! A library for turning flat ledger line entries into period-bucketed P&L
//! aggregates ready for a reporting dashboard.
//!
//! ## Core Concepts
//!
//! - **Period Ranges**: Inclusive, non-overlapping date ranges (weeks, months, quarters, years)
//!   generated from a reference month, a period kind and a breakdown
//! - **Classification**: Free-text account types mapped to a closed set of P&L categories;
//!   balance sheet accounts are always excluded
//! - **Aggregation**: Entries summed per account per period, optionally per property (class)
//! - **Hierarchy**: `"Parent:Child"` account names rolled up under synthesized parents
//! - **KPIs**: Gross profit, net operating income, net income and margins
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_period_aggregator::*;
//! use chrono::NaiveDate;
//!
//! let config = AggregatorConfig::new("2025-06", PeriodKind::Monthly, Breakdown::Total);
//! let entries = vec![
//!     LedgerEntry::new(NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(), "Rent Income", "Income", 4500.0),
//!     LedgerEntry::new(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(), "Cleaning", "Expense", 300.0),
//! ];
//!
//! let report = process_ledger(&config, &entries).unwrap();
//! assert_eq!(report.kpis.net_operating_income, 4200.0);
//! ```

pub mod cache;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod ingestion;
pub mod kpi;
pub mod periods;
pub mod report;
pub mod schema;
pub mod session;
pub mod utils;

#[cfg(feature = "remote")]
pub mod source;

pub use cache::{AggregationCache, CacheStats, TtlCache};
pub use classifier::{classify, is_balance_sheet_type};
pub use config::{AggregatorConfig, SourceConfig};
pub use engine::{aggregate, merge_buckets, property_list, AggregationStats, Aggregator};
pub use error::{AggregatorError, Result};
pub use hierarchy::{build_hierarchy, build_sections, AccountNode, ChildAccount};
pub use ingestion::{ingest_json, ingest_rows, IngestionReport, RawLedgerRow};
pub use kpi::{compute_kpis, KpiSummary};
pub use periods::{generate_ranges, generate_ranges_with, validate_ranges};
pub use report::PeriodStatement;
pub use schema::*;
pub use session::{DashboardSession, FetchOutcome, RequestSequencer, RequestTicket};

use log::{debug, info};
use serde::Serialize;

/// Everything the rendering layer needs for one view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationReport {
    pub request: ViewRequest,
    pub buckets: Vec<PeriodBucket>,
    /// Each account summed across all buckets.
    pub totals: Vec<AccountAggregate>,
    pub kpis: KpiSummary,
    pub period_kpis: Vec<KpiSummary>,
    pub properties: Vec<String>,
    pub stats: AggregationStats,
    pub skipped_rows: usize,
    pub zeroed_amounts: usize,
    pub filtered_by_property: usize,
}

impl AggregationReport {
    pub fn labels(&self) -> Vec<&str> {
        self.buckets.iter().map(|b| b.label()).collect()
    }

    pub fn hierarchy(&self) -> Vec<AccountNode> {
        build_hierarchy(&self.totals)
    }

    pub fn statement(&self) -> PeriodStatement {
        PeriodStatement::from_buckets(&self.buckets)
    }
}

pub struct PeriodAggregator;

impl PeriodAggregator {
    pub fn ranges_for(request: &ViewRequest) -> Result<Vec<PeriodRange>> {
        let ranges = generate_ranges_with(
            request.reference_month,
            request.period_kind,
            request.breakdown,
            request.week_start,
        )?;
        validate_ranges(&ranges)?;
        Ok(ranges)
    }

    pub fn build_report(request: &ViewRequest, entries: &[LedgerEntry]) -> Result<AggregationReport> {
        let ranges = Self::ranges_for(request)?;

        info!(
            "Aggregating {} entries for {:?}/{:?} at {}",
            entries.len(),
            request.period_kind,
            request.breakdown,
            request.reference_month
        );

        // The store may ignore the property filter, so it is re-applied here.
        let (selected, filtered_by_property) = match request.property_filter.as_deref() {
            Some(property) => {
                let property = normalize_property(Some(property));
                let kept: Vec<LedgerEntry> = entries
                    .iter()
                    .filter(|e| e.property == property)
                    .cloned()
                    .collect();
                let dropped = entries.len() - kept.len();
                (kept, dropped)
            }
            None => (entries.to_vec(), 0),
        };

        let aggregator = Aggregator::new(ranges, request.group_by_property);
        let (buckets, stats) = aggregator.aggregate_with_stats(&selected);
        let totals = merge_buckets(&buckets);
        let kpis = compute_kpis(&totals);
        let period_kpis = KpiSummary::per_period(&buckets);
        let properties = property_list(&buckets);

        debug!(
            "Report ready: {} bucket(s), {} account(s), net income {:.2}",
            buckets.len(),
            totals.len(),
            kpis.net_income
        );

        Ok(AggregationReport {
            request: request.clone(),
            buckets,
            totals,
            kpis,
            period_kpis,
            properties,
            stats,
            skipped_rows: 0,
            zeroed_amounts: 0,
            filtered_by_property,
        })
    }

    pub fn process_rows(request: &ViewRequest, rows: &[RawLedgerRow]) -> Result<AggregationReport> {
        let ingestion = ingest_rows(rows);
        let mut report = Self::build_report(request, &ingestion.entries)?;
        report.skipped_rows = ingestion.skipped();
        report.zeroed_amounts = ingestion.zeroed_amounts;
        Ok(report)
    }
}

pub fn process_ledger(config: &AggregatorConfig, entries: &[LedgerEntry]) -> Result<AggregationReport> {
    config.validate()?;
    PeriodAggregator::build_report(&config.view_request()?, entries)
}

pub fn process_rows(config: &AggregatorConfig, rows: &[RawLedgerRow]) -> Result<AggregationReport> {
    config.validate()?;
    PeriodAggregator::process_rows(&config.view_request()?, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_end_to_end_monthly_total() {
        let config = AggregatorConfig::new("2025-06", PeriodKind::Monthly, Breakdown::Total);
        let entries = vec![
            LedgerEntry::new(date(2025, 6, 5), "Rent Income", "Income", 4500.0),
            LedgerEntry::new(date(2025, 6, 10), "Cleaning", "Expense", 300.0),
        ];

        let report = process_ledger(&config, &entries).unwrap();
        assert_eq!(report.labels(), vec!["June 2025"]);
        assert_eq!(report.kpis.revenue, 4500.0);
        assert_eq!(report.kpis.operating_expenses, 300.0);
        assert_eq!(report.kpis.net_operating_income, 4200.0);
        assert_eq!(report.period_kpis.len(), 1);
        assert_eq!(report.properties, vec![NO_PROPERTY]);
    }

    #[test]
    fn test_property_filter_is_reapplied() {
        let mut config = AggregatorConfig::new("2025-06", PeriodKind::Monthly, Breakdown::Total);
        config.property_filter = Some("Oak St".to_string());
        let entries = vec![
            LedgerEntry::new(date(2025, 6, 5), "Rent Income", "Income", 4500.0).with_property("Oak St"),
            LedgerEntry::new(date(2025, 6, 6), "Rent Income", "Income", 900.0).with_property("Elm Ave"),
        ];

        let report = process_ledger(&config, &entries).unwrap();
        assert_eq!(report.kpis.revenue, 4500.0);
        assert_eq!(report.filtered_by_property, 1);
    }

    #[test]
    fn test_property_filter_ignores_surrounding_whitespace() {
        let mut config = AggregatorConfig::new("2025-06", PeriodKind::Monthly, Breakdown::Total);
        config.property_filter = Some("Oak St ".to_string());
        let entries = vec![
            LedgerEntry::new(date(2025, 6, 5), "Rent Income", "Income", 4500.0).with_property("Oak St"),
            LedgerEntry::new(date(2025, 6, 6), "Rent Income", "Income", 900.0).with_property("Elm Ave"),
            LedgerEntry::new(date(2025, 6, 7), "Late Fees", "Income", 25.0),
        ];

        let report = process_ledger(&config, &entries).unwrap();
        assert_eq!(report.kpis.revenue, 4500.0);
        assert_eq!(report.filtered_by_property, 2);
    }

    #[test]
    fn test_process_rows_carries_ingestion_counts() {
        let config = AggregatorConfig::new("2025-06", PeriodKind::Monthly, Breakdown::Total);
        let rows: Vec<RawLedgerRow> = serde_json::from_str(
            r#"[
                {"date": "2025-06-05", "account": "Rent Income", "account_type": "Income", "amount": 100},
                {"date": "bad", "account": "Rent Income", "account_type": "Income", "amount": 100},
                {"date": "2025-06-06", "account": "Rent Income", "account_type": "Income", "amount": "?"}
            ]"#,
        )
        .unwrap();

        let report = process_rows(&config, &rows).unwrap();
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.zeroed_amounts, 1);
        assert_eq!(report.kpis.revenue, 100.0);
        assert_eq!(report.stats.accepted, 2);
    }

    #[test]
    fn test_invalid_reference_month() {
        let config = AggregatorConfig::new("2025/06", PeriodKind::Monthly, Breakdown::Total);
        assert!(process_ledger(&config, &[]).is_err());
    }
}
