use crate::classifier::classify;
use crate::schema::*;
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Counters describing what happened to the input entries of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationStats {
    pub accepted: usize,
    pub out_of_range: usize,
    pub excluded: usize,
    /// Entries whose own classification differed from the category already held by their account.
    pub category_conflicts: usize,
}

pub struct Aggregator {
    ranges: Vec<PeriodRange>,
    group_by_property: bool,
}

impl Aggregator {
    pub fn new(mut ranges: Vec<PeriodRange>, group_by_property: bool) -> Self {
        ranges.sort_by_key(|r| r.start);
        Self {
            ranges,
            group_by_property,
        }
    }

    pub fn ranges(&self) -> &[PeriodRange] {
        &self.ranges
    }

    pub fn aggregate(&self, entries: &[LedgerEntry]) -> Vec<PeriodBucket> {
        self.aggregate_with_stats(entries).0
    }

    pub fn aggregate_with_stats(
        &self,
        entries: &[LedgerEntry],
    ) -> (Vec<PeriodBucket>, AggregationStats) {
        let mut buckets: Vec<PeriodBucket> =
            self.ranges.iter().cloned().map(PeriodBucket::new).collect();
        let mut stats = AggregationStats::default();
        let mut categories: HashMap<(&str, Option<&str>, &str), Option<PlCategory>> =
            HashMap::new();
        // Held across buckets so an account carries one category for the whole run.
        let mut account_categories: HashMap<&str, PlCategory> = HashMap::new();

        for entry in entries {
            let Some(idx) = self.locate(entry) else {
                stats.out_of_range += 1;
                continue;
            };

            let key = (
                entry.account_type.as_str(),
                entry.account_detail_type.as_deref(),
                entry.account.as_str(),
            );
            let category = *categories
                .entry(key)
                .or_insert_with(|| classify(key.0, key.1, key.2));

            let Some(category) = category else {
                stats.excluded += 1;
                continue;
            };

            let held = *account_categories
                .entry(entry.account.as_str())
                .or_insert(category);
            if held != category {
                stats.category_conflicts += 1;
                warn!(
                    "Account '{}' classified as {:?} on {} but already held as {:?}; keeping {:?}",
                    entry.account, category, entry.date, held, held
                );
            }

            let aggregate = buckets[idx]
                .accounts
                .entry(entry.account.clone())
                .or_insert_with(|| {
                    AccountAggregate::new(entry.account.clone(), held, self.group_by_property)
                });

            aggregate.push(entry.clone());
            stats.accepted += 1;
        }

        debug!(
            "Aggregated {} entries into {} period(s): {} accepted, {} out of range, {} excluded",
            entries.len(),
            buckets.len(),
            stats.accepted,
            stats.out_of_range,
            stats.excluded
        );

        (buckets, stats)
    }

    fn locate(&self, entry: &LedgerEntry) -> Option<usize> {
        self.ranges.iter().position(|r| r.contains(entry.date))
    }
}

pub fn aggregate(
    entries: &[LedgerEntry],
    ranges: &[PeriodRange],
    group_by_property: bool,
) -> Vec<PeriodBucket> {
    Aggregator::new(ranges.to_vec(), group_by_property).aggregate(entries)
}

/// Combines each account across all buckets, in bucket order. Used for the "Total" column.
pub fn merge_buckets(buckets: &[PeriodBucket]) -> Vec<AccountAggregate> {
    let mut merged: BTreeMap<String, AccountAggregate> = BTreeMap::new();

    for bucket in buckets {
        for (name, account) in &bucket.accounts {
            merged
                .entry(name.clone())
                .or_insert_with(|| {
                    AccountAggregate::new(
                        name.clone(),
                        account.category(),
                        account.tracks_properties(),
                    )
                })
                .absorb(account);
        }
    }

    merged.into_values().collect()
}

/// Distinct property labels seen in the buckets, alphabetical with `NO_PROPERTY` last.
pub fn property_list(buckets: &[PeriodBucket]) -> Vec<String> {
    let mut labels: BTreeSet<&str> = BTreeSet::new();

    for account in buckets.iter().flat_map(|b| b.accounts.values()) {
        for entry in account.entries() {
            labels.insert(entry.property.as_str());
        }
    }

    let has_sentinel = labels.remove(NO_PROPERTY);
    let mut list: Vec<String> = labels.into_iter().map(str::to_string).collect();
    if has_sentinel {
        list.push(NO_PROPERTY.to_string());
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn june_weeks() -> Vec<PeriodRange> {
        vec![
            PeriodRange::new(date(2025, 6, 1), date(2025, 6, 7), "Week 1 (1-7)"),
            PeriodRange::new(date(2025, 6, 8), date(2025, 6, 14), "Week 2 (8-14)"),
        ]
    }

    #[test]
    fn test_entries_land_in_their_week() {
        let entries = vec![
            LedgerEntry::new(date(2025, 6, 3), "Rent Income", "Income", 1000.0),
            LedgerEntry::new(date(2025, 6, 7), "Rent Income", "Income", 500.0),
            LedgerEntry::new(date(2025, 6, 8), "Rent Income", "Income", 250.0),
        ];

        let buckets = aggregate(&entries, &june_weeks(), false);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].account("Rent Income").unwrap().total(), 1500.0);
        assert_eq!(buckets[1].account("Rent Income").unwrap().total(), 250.0);
        assert!(buckets[0].account("Rent Income").unwrap().property_totals().is_none());
    }

    #[test]
    fn test_unsorted_ranges_produce_chronological_buckets() {
        let mut ranges = june_weeks();
        ranges.reverse();
        let buckets = aggregate(&[], &ranges, false);
        assert_eq!(buckets[0].label(), "Week 1 (1-7)");
        assert_eq!(buckets[1].label(), "Week 2 (8-14)");
        assert!(buckets.iter().all(|b| b.accounts.is_empty()));
    }

    #[test]
    fn test_stats_count_drops() {
        let entries = vec![
            LedgerEntry::new(date(2025, 6, 3), "Rent Income", "Income", 1000.0),
            LedgerEntry::new(date(2025, 7, 3), "Rent Income", "Income", 1000.0),
            LedgerEntry::new(date(2025, 6, 4), "Checking", "Bank", 1000.0),
            LedgerEntry::new(date(2025, 6, 5), "Misc", "Unknown", 1.0),
        ];

        let (buckets, stats) = Aggregator::new(june_weeks(), false).aggregate_with_stats(&entries);
        assert_eq!(
            stats,
            AggregationStats {
                accepted: 1,
                out_of_range: 1,
                excluded: 2,
                category_conflicts: 0,
            }
        );
        assert_eq!(buckets[0].entry_count(), 1);
    }

    #[test]
    fn test_category_conflict_keeps_first_category() {
        let entries = vec![
            LedgerEntry::new(date(2025, 6, 3), "Interest", "Other Income", 40.0),
            LedgerEntry::new(date(2025, 6, 4), "Interest", "Other Expense", 10.0),
        ];

        let (buckets, stats) = Aggregator::new(june_weeks(), false).aggregate_with_stats(&entries);
        let interest = buckets[0].account("Interest").unwrap();
        assert_eq!(interest.category(), PlCategory::OtherIncome);
        assert_eq!(interest.total(), 50.0);
        assert_eq!(stats.category_conflicts, 1);
    }

    #[test]
    fn test_category_conflict_spans_buckets() {
        let entries = vec![
            LedgerEntry::new(date(2025, 6, 3), "Interest", "Other Income", 40.0),
            LedgerEntry::new(date(2025, 6, 10), "Interest", "Other Expense", 10.0),
        ];

        let (buckets, stats) = Aggregator::new(june_weeks(), false).aggregate_with_stats(&entries);
        assert_eq!(buckets[0].account("Interest").unwrap().category(), PlCategory::OtherIncome);
        assert_eq!(buckets[1].account("Interest").unwrap().category(), PlCategory::OtherIncome);
        assert_eq!(stats.category_conflicts, 1);

        let merged = merge_buckets(&buckets);
        let period_net: f64 = buckets.iter().map(|b| b.kpis().net_income).sum();
        assert_eq!(crate::kpi::compute_kpis(&merged).net_income, period_net);
        assert_eq!(period_net, 50.0);
    }

    #[test]
    fn test_property_dimension() {
        let entries = vec![
            LedgerEntry::new(date(2025, 6, 3), "Repairs", "Expense", 120.0).with_property("Oak St"),
            LedgerEntry::new(date(2025, 6, 4), "Repairs", "Expense", 80.0).with_property("Elm Ave"),
            LedgerEntry::new(date(2025, 6, 5), "Repairs", "Expense", 30.0),
        ];

        let buckets = aggregate(&entries, &june_weeks(), true);
        let repairs = buckets[0].account("Repairs").unwrap();
        assert_eq!(repairs.total(), 230.0);
        assert_eq!(repairs.property_total("Oak St"), 120.0);
        assert_eq!(repairs.property_total("Elm Ave"), 80.0);
        assert_eq!(repairs.property_total(NO_PROPERTY), 30.0);

        assert_eq!(property_list(&buckets), vec!["Elm Ave", "Oak St", NO_PROPERTY]);
    }

    #[test]
    fn test_merge_buckets_sums_across_periods() {
        let entries = vec![
            LedgerEntry::new(date(2025, 6, 3), "Rent Income", "Income", 1000.0),
            LedgerEntry::new(date(2025, 6, 10), "Rent Income", "Income", 250.0),
            LedgerEntry::new(date(2025, 6, 11), "Cleaning", "Expense", 75.0),
        ];

        let buckets = aggregate(&entries, &june_weeks(), false);
        let merged = merge_buckets(&buckets);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name(), "Cleaning");
        assert_eq!(merged[1].name(), "Rent Income");
        assert_eq!(merged[1].total(), 1250.0);
        assert_eq!(merged[1].entries()[0].date, date(2025, 6, 3));
    }
}
