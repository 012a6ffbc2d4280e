//! Error types for emrcost
//!
//! Library code uses `crate::error::Result<T>` which returns `EmrCostError`.
//! CLI code uses `anyhow::Result<T>` for top-level error handling; the
//! conversion happens at the CLI boundary so error chains are preserved.
//!
//! ## Retry Awareness
//!
//! Errors implement `IsRetryable` so the `RetryPolicy` in `src/retry.rs` can
//! decide whether to back off and try again. Only `Throttling` is retryable:
//! it signals the EMR API rejected a request under its per-account rate quota,
//! which is transient by definition. Everything else is a data or
//! configuration defect and fails immediately.

use thiserror::Error;

/// Main error type for emrcost
#[derive(Error, Debug)]
pub enum EmrCostError {
    /// The EMR API rejected a request under its rate quota.
    #[error("EMR API throttled the request: {0}")]
    Throttling(String),

    /// Could not establish a session with the EMR API for the region.
    #[error("could not establish connection with EMR API: {0}")]
    Connection(String),

    /// Any other EMR API failure.
    #[error("EMR API error during {operation}: {message}")]
    Api { operation: String, message: String },

    #[error("failed to parse {what}: {value:?}")]
    Parse { what: &'static str, value: String },

    /// A spot group carried a bid price that is not a non-negative decimal.
    #[error("invalid bid price {value:?} for instance group {group_id}")]
    InvalidPrice { group_id: String, value: String },

    /// An on-demand instance type has no entry in the price table.
    #[error("no hourly price configured for instance type {0:?}")]
    MissingPrice(String),

    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<EmrCostError>,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EmrCostError>;

/// Trait for determining if an error is retryable
///
/// Used by `RetryPolicy` implementations to decide whether an error should
/// trigger a backoff-and-retry cycle.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for EmrCostError {
    fn is_retryable(&self) -> bool {
        matches!(self, EmrCostError::Throttling(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_throttling_is_retryable() {
        assert!(EmrCostError::Throttling("rate exceeded".into()).is_retryable());
        assert!(!EmrCostError::MissingPrice("m4.large".into()).is_retryable());
        assert!(!EmrCostError::Parse {
            what: "timeline timestamp",
            value: "garbage".into()
        }
        .is_retryable());
        assert!(!EmrCostError::Connection("dns failure".into()).is_retryable());
    }

    #[test]
    fn config_error_converts() {
        let err: EmrCostError = ConfigError::NotFound("config.toml".into()).into();
        assert!(matches!(err, EmrCostError::Config(_)));
        assert!(!err.is_retryable());
    }
}
