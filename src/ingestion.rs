use crate::error::Result;
use crate::schema::{normalize_property, LedgerEntry};
use crate::utils::{parse_amount, parse_ledger_date};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A ledger row exactly as the data source returned it.
///
/// Every field is optional and amounts are kept as raw JSON so that one bad
/// cell never fails the whole payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLedgerRow {
    #[serde(default, alias = "txn_date", alias = "transaction_date")]
    pub date: Option<Value>,
    #[serde(default, alias = "account_name")]
    pub account: Option<String>,
    #[serde(default, alias = "accountType")]
    pub account_type: Option<String>,
    #[serde(default, alias = "accountDetailType", alias = "detail_type")]
    pub account_detail_type: Option<String>,
    #[serde(default, alias = "property")]
    pub class: Option<String>,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub debit: Value,
    #[serde(default)]
    pub credit: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestionReport {
    pub entries: Vec<LedgerEntry>,
    pub skipped_invalid_date: usize,
    pub skipped_missing_account: usize,
    /// Rows kept with an amount of zero because no numeric amount could be read.
    pub zeroed_amounts: usize,
}

impl IngestionReport {
    pub fn skipped(&self) -> usize {
        self.skipped_invalid_date + self.skipped_missing_account
    }
}

pub fn ingest_rows(rows: &[RawLedgerRow]) -> IngestionReport {
    let mut report = IngestionReport::default();

    for row in rows {
        let Some(date) = row.date.as_ref().and_then(value_to_date) else {
            report.skipped_invalid_date += 1;
            continue;
        };

        let account = match row.account.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                report.skipped_missing_account += 1;
                continue;
            }
        };

        let debit = parse_amount(&row.debit);
        let credit = parse_amount(&row.credit);
        let has_columns = debit.is_some() || credit.is_some();

        let amount = if has_columns {
            0.0
        } else {
            match parse_amount(&row.amount) {
                Some(v) => v,
                None => {
                    report.zeroed_amounts += 1;
                    0.0
                }
            }
        };

        let mut entry = LedgerEntry::new(
            date,
            account,
            row.account_type.as_deref().unwrap_or_default().trim(),
            amount,
        );
        entry.account_detail_type = row
            .account_detail_type
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        entry.property = normalize_property(row.class.as_deref());
        if has_columns {
            entry.debit = Some(debit.unwrap_or(0.0));
            entry.credit = Some(credit.unwrap_or(0.0));
        }

        report.entries.push(entry);
    }

    if report.skipped() > 0 || report.zeroed_amounts > 0 {
        warn!(
            "Ingested {} of {} rows ({} bad dates, {} missing accounts, {} zeroed amounts)",
            report.entries.len(),
            rows.len(),
            report.skipped_invalid_date,
            report.skipped_missing_account,
            report.zeroed_amounts
        );
    } else {
        debug!("Ingested {} rows", rows.len());
    }

    report
}

/// Parses a JSON array of rows, as returned by the REST endpoint.
pub fn ingest_json(payload: &str) -> Result<IngestionReport> {
    let rows: Vec<RawLedgerRow> = serde_json::from_str(payload)?;
    Ok(ingest_rows(&rows))
}

fn value_to_date(value: &Value) -> Option<chrono::NaiveDate> {
    match value {
        Value::String(s) => parse_ledger_date(s),
        _ => None,
    }
}
