use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("Invalid reference month '{0}': expected YYYY-MM")]
    InvalidReferenceMonth(String),

    #[error("Invalid period range '{label}': end {end} is before start {start}")]
    InvalidRange {
        label: String,
        start: String,
        end: String,
    },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Data source error: {0}")]
    SourceError(String),

    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
