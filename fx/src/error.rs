//! Exchange-rate access error types.

use thiserror::Error;

/// Message carried by [`FxError::PolicyRejected`].
pub const CURRENCY_NOT_SUPPORTED: &str = "Currency not supported";

/// Errors that can occur while serving exchange-rate requests.
#[derive(Debug, Error)]
pub enum FxError {
    /// Network failure, timeout, or a server-class/throttling response.
    #[error("Transient upstream error from {source_name}: {message}")]
    TransientUpstream {
        source_name: String,
        message: String,
    },

    /// Malformed response or an unexpected client-class status.
    #[error("Upstream error from {source_name}: {message}")]
    PermanentUpstream {
        source_name: String,
        message: String,
    },

    /// Upstream answered but the requested currency was missing.
    #[error("Rate not found for currency: {0}")]
    RateNotFound(String),

    /// Currency pair rejected by the currency policy.
    #[error("{}", CURRENCY_NOT_SUPPORTED)]
    PolicyRejected,

    /// Circuit breaker is open for the destination.
    #[error("Circuit open for {destination}")]
    CircuitOpen { destination: String },

    /// Request arguments outside the supported contract.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl FxError {
    pub fn transient(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        FxError::TransientUpstream {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn permanent(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        FxError::PermanentUpstream {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Check if this error is eligible for retry and breaker accounting.
    pub fn is_transient(&self) -> bool {
        matches!(self, FxError::TransientUpstream { .. })
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::TransientUpstream { .. } => "TRANSIENT_UPSTREAM",
            FxError::PermanentUpstream { .. } => "PERMANENT_UPSTREAM",
            FxError::RateNotFound(_) => "RATE_NOT_FOUND",
            FxError::PolicyRejected => "POLICY_REJECTED",
            FxError::CircuitOpen { .. } => "CIRCUIT_OPEN",
            FxError::InvalidRequest(_) => "INVALID_REQUEST",
            FxError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
