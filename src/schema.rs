use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Property label used when a ledger row carries no class.
pub const NO_PROPERTY: &str = "No Property";

/// Profit & loss classification of a ledger account.
///
/// Balance sheet accounts have no variant here: the classifier returns `None`
/// for them and they never reach an aggregate.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum PlCategory {
    #[schemars(description = "Income from sales of goods or services (credit balance)")]
    Revenue,

    #[schemars(description = "Direct costs of goods or services sold (debit balance)")]
    Cogs,

    #[schemars(description = "Operating expenses such as rent, repairs, utilities (debit balance)")]
    OperatingExpenses,

    #[schemars(description = "Non-operating income such as interest or dividends (credit balance)")]
    OtherIncome,

    #[schemars(description = "Non-operating expenses such as interest, depreciation (debit balance)")]
    OtherExpenses,
}

impl PlCategory {
    pub const ALL: [PlCategory; 5] = [
        PlCategory::Revenue,
        PlCategory::Cogs,
        PlCategory::OperatingExpenses,
        PlCategory::OtherIncome,
        PlCategory::OtherExpenses,
    ];

    /// True for categories whose natural balance is a credit.
    pub fn is_credit_natural(self) -> bool {
        matches!(self, PlCategory::Revenue | PlCategory::OtherIncome)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PlCategory::Revenue => "Revenue",
            PlCategory::Cogs => "Cost of Goods Sold",
            PlCategory::OperatingExpenses => "Operating Expenses",
            PlCategory::OtherIncome => "Other Income",
            PlCategory::OtherExpenses => "Other Expenses",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PeriodKind {
    #[schemars(description = "The calendar month of the reference month")]
    Monthly,

    #[schemars(description = "The calendar quarter containing the reference month")]
    Quarterly,

    #[schemars(description = "The calendar year of the reference month")]
    Yearly,

    #[schemars(description = "The twelve months ending with the reference month")]
    Trailing12,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Breakdown {
    #[schemars(description = "A single column covering the whole period")]
    Total,

    #[schemars(
        description = "Sub-columns: weeks for Monthly, quarters to date for Quarterly, months to date for Yearly"
    )]
    Detailed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

/// A ledger line as delivered by the data source, after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub account: String,
    pub account_type: String,
    #[serde(default)]
    pub account_detail_type: Option<String>,
    /// Property (class) label; `NO_PROPERTY` when the row had none.
    #[serde(rename = "class", default = "default_property")]
    pub property: String,
    /// Signed amount, already netted by the source in the category's natural direction.
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub debit: Option<f64>,
    #[serde(default)]
    pub credit: Option<f64>,
}

fn default_property() -> String {
    NO_PROPERTY.to_string()
}

impl LedgerEntry {
    pub fn new(
        date: NaiveDate,
        account: impl Into<String>,
        account_type: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            date,
            account: account.into(),
            account_type: account_type.into(),
            account_detail_type: None,
            property: NO_PROPERTY.to_string(),
            amount,
            debit: None,
            credit: None,
        }
    }

    pub fn with_detail_type(mut self, detail_type: impl Into<String>) -> Self {
        self.account_detail_type = Some(detail_type.into());
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = normalize_property(Some(&property.into()));
        self
    }

    pub fn with_debit_credit(mut self, debit: f64, credit: f64) -> Self {
        self.debit = Some(debit);
        self.credit = Some(credit);
        self
    }

    /// Amount signed so that positive values increase the category's natural balance.
    ///
    /// Rows with debit/credit columns are netted per category; rows with only a
    /// signed amount are taken as already netted.
    pub fn normalized_amount(&self, category: PlCategory) -> f64 {
        if self.debit.is_none() && self.credit.is_none() {
            return self.amount;
        }
        let debit = self.debit.unwrap_or(0.0);
        let credit = self.credit.unwrap_or(0.0);
        if category.is_credit_natural() {
            credit - debit
        } else {
            debit - credit
        }
    }
}

/// Maps a missing or blank property label to `NO_PROPERTY`.
pub fn normalize_property(label: Option<&str>) -> String {
    match label.map(str::trim) {
        Some(l) if !l.is_empty() => l.to_string(),
        _ => NO_PROPERTY.to_string(),
    }
}

/// Inclusive date range with a display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl PeriodRange {
    pub fn new(start: NaiveDate, end: NaiveDate, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Aggregate of one account within one period (or across periods after merging).
///
/// `total` is only ever changed together with `entries`, so it always equals
/// the sum of the normalized amounts of the entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountAggregate {
    name: String,
    category: PlCategory,
    total: f64,
    entries: Vec<LedgerEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    property_totals: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    property_entries: Option<BTreeMap<String, Vec<LedgerEntry>>>,
}

impl AccountAggregate {
    pub fn new(name: impl Into<String>, category: PlCategory, track_properties: bool) -> Self {
        Self {
            name: name.into(),
            category,
            total: 0.0,
            entries: Vec::new(),
            property_totals: track_properties.then(BTreeMap::new),
            property_entries: track_properties.then(BTreeMap::new),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> PlCategory {
        self.category
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn property_totals(&self) -> Option<&BTreeMap<String, f64>> {
        self.property_totals.as_ref()
    }

    pub fn property_entries(&self) -> Option<&BTreeMap<String, Vec<LedgerEntry>>> {
        self.property_entries.as_ref()
    }

    pub fn property_total(&self, property: &str) -> f64 {
        self.property_totals
            .as_ref()
            .and_then(|t| t.get(property))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn tracks_properties(&self) -> bool {
        self.property_totals.is_some()
    }

    pub(crate) fn push(&mut self, entry: LedgerEntry) {
        let value = entry.normalized_amount(self.category);
        self.total += value;

        if let Some(totals) = self.property_totals.as_mut() {
            *totals.entry(entry.property.clone()).or_insert(0.0) += value;
        }
        if let Some(by_property) = self.property_entries.as_mut() {
            by_property
                .entry(entry.property.clone())
                .or_default()
                .push(entry.clone());
        }

        self.entries.push(entry);
    }

    /// Folds every entry of `other` into this aggregate.
    pub(crate) fn absorb(&mut self, other: &AccountAggregate) {
        for entry in &other.entries {
            self.push(entry.clone());
        }
    }
}

/// Accounts aggregated for one period range, keyed by account name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBucket {
    pub range: PeriodRange,
    pub accounts: BTreeMap<String, AccountAggregate>,
}

impl PeriodBucket {
    pub fn new(range: PeriodRange) -> Self {
        Self {
            range,
            accounts: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.range.label
    }

    pub fn account(&self, name: &str) -> Option<&AccountAggregate> {
        self.accounts.get(name)
    }

    pub fn category_total(&self, category: PlCategory) -> f64 {
        self.accounts
            .values()
            .filter(|a| a.category() == category)
            .fold(0.0, |acc, a| acc + a.total())
    }

    pub fn entry_count(&self) -> usize {
        self.accounts.values().map(|a| a.entries().len()).sum()
    }
}

/// The parameters of one dashboard view; also the cache key for its report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ViewRequest {
    #[schemars(description = "Any date inside the reference month; normalized to the 1st")]
    pub reference_month: NaiveDate,
    pub period_kind: PeriodKind,
    pub breakdown: Breakdown,
    #[serde(default)]
    pub week_start: WeekStart,
    #[serde(default)]
    pub group_by_property: bool,
    #[serde(default)]
    #[schemars(description = "Restrict the fetch to a single property (class) label")]
    pub property_filter: Option<String>,
}
