//! Error types for configuration loading and metric collection.

use crate::config::MetricName;

/// Error type for collection failures.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The metric has no entry in the active configuration.
    #[error("metric {0} is not configured")]
    MetricNotConfigured(MetricName),
    /// A network metric was configured with a direction other than `receive`/`transmit`.
    #[error("unknown direction '{direction}' configured for {metric}")]
    UnknownDirection { metric: MetricName, direction: String },
    /// A connection reported a socket kind with no protocol mapping.
    #[error("unknown connection protocol code {0}")]
    UnknownProtocol(u32),
    /// A configured field name is not part of the record's schema.
    #[error("field '{field}' is not supported by {metric}")]
    UnsupportedField { metric: MetricName, field: String },
    /// I/O error reading provider sources.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Parse error in provider sources.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = CollectError> = std::result::Result<T, E>;
