//! REST data source for ledger rows.
//!
//! Talks to a PostgREST-style endpoint: `GET {base_url}/rest/v1/{table}` with
//! `date=gte.` / `date=lte.` / `class=eq.` filters and `limit`/`offset` paging.
//! Paging continues until an empty page, since the store may silently return
//! fewer rows than asked for. Each page is a single attempt; retry policy
//! belongs to the caller.

use crate::config::SourceConfig;
use crate::error::{AggregatorError, Result};
use crate::ingestion::RawLedgerRow;
use crate::schema::ViewRequest;
use crate::session::{DashboardSession, FetchOutcome};
use crate::PeriodAggregator;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub property: Option<String>,
}

impl LedgerQuery {
    /// The date span covered by all ranges of `request`.
    pub fn for_request(request: &ViewRequest) -> Result<Self> {
        let ranges = PeriodAggregator::ranges_for(request)?;
        let (first, last) = match (ranges.first(), ranges.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(AggregatorError::DateError(
                    "Request produced no period ranges".to_string(),
                ))
            }
        };

        Ok(Self {
            start: first.start,
            end: last.end,
            property: request
                .property_filter
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        })
    }

    pub fn with_property(&self, property: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            ..self.clone()
        }
    }
}

#[async_trait]
pub trait LedgerSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_rows(&self, query: &LedgerQuery) -> Result<Vec<RawLedgerRow>>;
}

pub struct RestLedgerSource {
    client: Client,
    config: SourceConfig,
}

impl RestLedgerSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table
        )
    }

    pub fn query_params(query: &LedgerQuery, offset: usize, limit: usize) -> Vec<(String, String)> {
        let mut params = vec![
            ("select".to_string(), "*".to_string()),
            ("date".to_string(), format!("gte.{}", query.start)),
            ("date".to_string(), format!("lte.{}", query.end)),
        ];
        if let Some(property) = &query.property {
            params.push(("class".to_string(), format!("eq.{}", property)));
        }
        params.push(("order".to_string(), "date.asc".to_string()));
        params.push(("limit".to_string(), limit.to_string()));
        params.push(("offset".to_string(), offset.to_string()));
        params
    }

    async fn fetch_page(&self, query: &LedgerQuery, offset: usize, limit: usize) -> Result<Vec<RawLedgerRow>> {
        let mut request = self
            .client
            .get(self.endpoint())
            .query(&Self::query_params(query, offset, limit))
            .header("Accept", "application/json");

        if let Some(key) = &self.config.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let res = request.send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(AggregatorError::SourceError(format!(
                "{} returned status {}: {}",
                self.config.table, status, err_text
            )));
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl LedgerSource for RestLedgerSource {
    fn name(&self) -> &str {
        "rest"
    }

    async fn fetch_rows(&self, query: &LedgerQuery) -> Result<Vec<RawLedgerRow>> {
        let mut rows: Vec<RawLedgerRow> = Vec::new();
        let mut server_cap: Option<usize> = None;

        // Only an empty page proves the scan is complete; a short page may be a store-side cap.
        loop {
            let limit = self
                .config
                .page_size
                .min(self.config.max_rows.saturating_sub(rows.len()));
            if limit == 0 {
                warn!(
                    "Stopped after {} rows (max_rows); results for {}..{} may be incomplete",
                    rows.len(),
                    query.start,
                    query.end
                );
                break;
            }

            let page = self.fetch_page(query, rows.len(), limit).await?;
            let received = page.len();
            if received == 0 {
                break;
            }
            rows.extend(page);

            if received < limit {
                debug!("Short page ({} < {}), requesting next offset {}", received, limit, rows.len());
                server_cap = Some(server_cap.map_or(received, |cap| cap.max(received)));
            }
        }

        if let Some(cap) = server_cap {
            if cap < self.config.page_size && rows.len() > cap {
                warn!(
                    "{} appears to cap pages at {} rows (page_size {}); lower page_size to match",
                    self.config.table, cap, self.config.page_size
                );
            }
        }

        info!(
            "Fetched {} rows from {} for {}..{}",
            rows.len(),
            self.config.table,
            query.start,
            query.end
        );
        Ok(rows)
    }
}

/// Fetches one query per property concurrently and concatenates the rows in property order.
pub async fn fetch_rows_for_properties(
    source: &dyn LedgerSource,
    query: &LedgerQuery,
    properties: &[String],
) -> Result<Vec<RawLedgerRow>> {
    let queries: Vec<LedgerQuery> = properties.iter().map(|p| query.with_property(p.as_str())).collect();
    let results = join_all(queries.iter().map(|q| source.fetch_rows(q))).await;

    let mut rows = Vec::new();
    for result in results {
        rows.extend(result?);
    }
    Ok(rows)
}

/// Fetches and aggregates one view. Never fails: errors come back as `FetchOutcome::Failed`.
pub async fn fetch_report(source: &dyn LedgerSource, request: &ViewRequest) -> FetchOutcome {
    let query = match LedgerQuery::for_request(request) {
        Ok(query) => query,
        Err(e) => return FetchOutcome::from_result(Err(e)),
    };

    match source.fetch_rows(&query).await {
        Ok(rows) => FetchOutcome::from_result(PeriodAggregator::process_rows(request, &rows)),
        Err(e) => {
            warn!("Fetch from {} source failed: {}", source.name(), e);
            FetchOutcome::from_result(Err(e))
        }
    }
}

impl DashboardSession {
    /// Fetches `request` from `source` (or the cache) and applies the result if still current.
    pub async fn refresh(&mut self, source: &dyn LedgerSource, request: ViewRequest) -> FetchOutcome {
        let ticket = self.begin(request.clone());

        let outcome = match self.cached(&request) {
            Some(report) => FetchOutcome::Loaded(report),
            None => fetch_report(source, &request).await,
        };

        self.complete(ticket, outcome.clone());
        outcome
    }
}
