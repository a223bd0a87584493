//! View state for a dashboard page.
//!
//! Each fetch gets a ticket. Only the result carrying the most recently issued
//! ticket may replace the current report; anything older is dropped. A failed
//! fetch records its error but leaves the previous report in place.

use crate::cache::{AggregationCache, CacheStats};
use crate::config::AggregatorConfig;
use crate::error::Result;
use crate::schema::{LedgerEntry, ViewRequest};
use crate::{AggregationReport, PeriodAggregator};
use log::{debug, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Result of one fetch-and-aggregate attempt. Never an `Err`: failures are data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Loaded(AggregationReport),
    Failed { error: String },
}

impl FetchOutcome {
    pub fn from_result(result: Result<AggregationReport>) -> Self {
        match result {
            Ok(report) => FetchOutcome::Loaded(report),
            Err(e) => FetchOutcome::Failed {
                error: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Loaded(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchOutcome::Loaded(_) => None,
            FetchOutcome::Failed { error } => Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    pub id: u64,
    pub request: ViewRequest,
}

/// Issues increasing ticket ids. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    latest: Arc<AtomicU64>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, request: ViewRequest) -> RequestTicket {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket { id, request }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.id
    }
}

#[derive(Debug)]
pub struct DashboardSession {
    sequencer: RequestSequencer,
    cache: AggregationCache,
    current: Option<AggregationReport>,
    last_error: Option<String>,
}

impl DashboardSession {
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            sequencer: RequestSequencer::new(),
            cache: AggregationCache::new(cache_ttl),
            current: None,
            last_error: None,
        }
    }

    pub fn from_config(config: &AggregatorConfig) -> Self {
        Self::new(config.cache_ttl())
    }

    pub fn sequencer(&self) -> &RequestSequencer {
        &self.sequencer
    }

    pub fn begin(&self, request: ViewRequest) -> RequestTicket {
        self.sequencer.issue(request)
    }

    /// A still-fresh report for `request`, if one was loaded earlier.
    pub fn cached(&mut self, request: &ViewRequest) -> Option<AggregationReport> {
        self.cache.get(request).cloned()
    }

    /// Applies `outcome` if `ticket` is still the latest and caches a loaded report.
    /// Returns whether it was applied.
    pub fn complete(&mut self, ticket: RequestTicket, outcome: FetchOutcome) -> bool {
        self.apply(ticket, outcome, true)
    }

    fn apply(&mut self, ticket: RequestTicket, outcome: FetchOutcome, cache: bool) -> bool {
        if !self.sequencer.is_current(&ticket) {
            debug!("Dropping stale result for request #{}", ticket.id);
            return false;
        }

        match outcome {
            FetchOutcome::Loaded(report) => {
                if cache {
                    self.cache.insert(ticket.request, report.clone());
                }
                self.current = Some(report);
                self.last_error = None;
            }
            FetchOutcome::Failed { error } => {
                warn!("Request #{} failed: {}", ticket.id, error);
                self.last_error = Some(error);
            }
        }
        true
    }

    /// Aggregates caller-supplied entries for `request`.
    ///
    /// Always rebuilt from `entries`; the cache is neither read nor written
    /// because it is keyed on the request alone.
    pub fn load_entries(&mut self, request: ViewRequest, entries: &[LedgerEntry]) -> FetchOutcome {
        let outcome = FetchOutcome::from_result(PeriodAggregator::build_report(&request, entries));
        let ticket = self.begin(request);

        self.apply(ticket, outcome.clone(), false);
        outcome
    }

    pub fn current(&self) -> Option<&AggregationReport> {
        self.current.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn evict_expired(&mut self) -> usize {
        self.cache.evict_expired()
    }
}
