//! Aggregator configuration.
//!
//! Loaded from a JSON file; a handful of environment variables override the
//! file so deployments can point at a different data source without editing it:
//!
//! - `PERIOD_AGGREGATOR_REFERENCE_MONTH` (`YYYY-MM`)
//! - `PERIOD_AGGREGATOR_PERIOD_KIND` (`Monthly`, `Quarterly`, `Yearly`, `Trailing12`)
//! - `PERIOD_AGGREGATOR_SOURCE_URL`
//! - `PERIOD_AGGREGATOR_API_KEY`

use crate::error::{AggregatorError, Result};
use crate::schema::{Breakdown, PeriodKind, ViewRequest, WeekStart};
use crate::utils::parse_year_month;
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_REFERENCE_MONTH: &str = "PERIOD_AGGREGATOR_REFERENCE_MONTH";
pub const ENV_PERIOD_KIND: &str = "PERIOD_AGGREGATOR_PERIOD_KIND";
pub const ENV_SOURCE_URL: &str = "PERIOD_AGGREGATOR_SOURCE_URL";
pub const ENV_API_KEY: &str = "PERIOD_AGGREGATOR_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SourceConfig {
    #[schemars(description = "Base URL of the REST data store, e.g. https://project.example.co")]
    pub base_url: String,

    #[serde(default = "default_table")]
    #[schemars(description = "Table (or view) holding the ledger rows")]
    pub table: String,

    #[serde(default, skip_serializing)]
    #[schemars(description = "API key sent as both the apikey header and a bearer token")]
    pub api_key: Option<String>,

    #[serde(default = "default_page_size")]
    #[schemars(description = "Rows requested per page")]
    pub page_size: usize,

    #[serde(default = "default_max_rows")]
    #[schemars(
        description = "Upper bound on rows fetched for one view. The store may also cap results on its own; neither cap is treated as an error."
    )]
    pub max_rows: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_table() -> String {
    "ledger_entries".to_string()
}

fn default_page_size() -> usize {
    1000
}

fn default_max_rows() -> usize {
    50_000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl SourceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            table: default_table(),
            api_key: None,
            page_size: default_page_size(),
            max_rows: default_max_rows(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AggregatorConfig {
    #[schemars(description = "Reference month in YYYY-MM format")]
    pub reference_month: String,

    pub period_kind: PeriodKind,

    pub breakdown: Breakdown,

    #[serde(default)]
    #[schemars(description = "First day of a week for Monthly/Detailed views")]
    pub week_start: WeekStart,

    #[serde(default)]
    #[schemars(description = "Also break every account out per property (class) label")]
    pub group_by_property: bool,

    #[serde(default)]
    pub property_filter: Option<String>,

    #[serde(default = "default_cache_ttl_secs")]
    #[schemars(description = "Seconds an aggregated view stays in the cache")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub source: Option<SourceConfig>,
}

impl AggregatorConfig {
    pub fn new(reference_month: impl Into<String>, period_kind: PeriodKind, breakdown: Breakdown) -> Self {
        Self {
            reference_month: reference_month.into(),
            period_kind,
            breakdown,
            week_start: WeekStart::default(),
            group_by_property: false,
            property_filter: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            source: None,
        }
    }

    /// Reads the file, applies environment overrides, and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        debug!(
            "Loaded aggregator config from {} ({:?}/{:?} at {})",
            path.display(),
            config.period_kind,
            config.breakdown,
            config.reference_month
        );
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup` (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(month) = lookup(ENV_REFERENCE_MONTH) {
            self.reference_month = month;
        }

        if let Some(kind) = lookup(ENV_PERIOD_KIND) {
            self.period_kind = serde_json::from_value(serde_json::Value::String(kind.clone()))
                .map_err(|_| AggregatorError::ConfigError(format!("Unknown period kind '{}'", kind)))?;
        }

        if let Some(url) = lookup(ENV_SOURCE_URL) {
            match self.source.as_mut() {
                Some(source) => source.base_url = url,
                None => self.source = Some(SourceConfig::new(url)),
            }
        }

        if let Some(key) = lookup(ENV_API_KEY) {
            if let Some(source) = self.source.as_mut() {
                source.api_key = Some(key);
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.reference_date()?;

        if let Some(source) = &self.source {
            if source.base_url.trim().is_empty() {
                return Err(AggregatorError::ConfigError("source.base_url is empty".to_string()));
            }
            if source.table.trim().is_empty() {
                return Err(AggregatorError::ConfigError("source.table is empty".to_string()));
            }
            if source.page_size == 0 {
                return Err(AggregatorError::ConfigError(
                    "source.page_size must be at least 1".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn reference_date(&self) -> Result<NaiveDate> {
        parse_year_month(&self.reference_month)
    }

    pub fn view_request(&self) -> Result<ViewRequest> {
        Ok(ViewRequest {
            reference_month: self.reference_date()?,
            period_kind: self.period_kind,
            breakdown: self.breakdown,
            week_start: self.week_start,
            group_by_property: self.group_by_property,
            property_filter: self.property_filter.clone(),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AggregatorConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}
