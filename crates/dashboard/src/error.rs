//! Unified error handling for the dashboard providers.
//!
//! Every provider reports failures through [`DashboardError`] so the pollers
//! can log them uniformly. Schema problems and authentication problems get
//! their own variants instead of collapsing into a generic failure.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// The provider answered with a non-success status
    #[error("Error fetching data: {status_text}")]
    Http {
        status: StatusCode,
        status_text: String,
    },

    /// Connection, TLS or body transfer failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("Invalid response from {provider}: {message}")]
    Validation {
        provider: &'static str,
        message: String,
    },

    /// Token exchange or refresh rejected, or no credentials held
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Local state directory could not be read or written
    #[error("Cache error: {0}")]
    Cache(#[from] std::io::Error),

    /// Environment variable missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DashboardError {
    /// Create an error from a non-success response status
    pub fn http(status: StatusCode) -> Self {
        DashboardError::Http {
            status,
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    /// Create a validation error for a provider
    pub fn validation(provider: &'static str, message: impl Into<String>) -> Self {
        DashboardError::Validation {
            provider,
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        DashboardError::Auth(message.into())
    }

    /// Create a config error for missing env vars
    pub fn missing_env(var_name: &str) -> Self {
        DashboardError::Config(format!("{} environment variable must be set", var_name))
    }

    /// Whether the operator has to sign in again
    pub fn is_auth(&self) -> bool {
        matches!(self, DashboardError::Auth(_))
    }
}

/// Result type alias for provider operations
pub type DashboardResult<T> = Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_carries_status_text() {
        let err = DashboardError::http(StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Error fetching data: Not Found");
    }

    #[test]
    fn test_validation_error_names_provider() {
        let err = DashboardError::validation("transport", "missing field `departures`");
        assert_eq!(
            err.to_string(),
            "Invalid response from transport: missing field `departures`"
        );
        assert!(!err.is_auth());
    }

    #[test]
    fn test_missing_env() {
        let err = DashboardError::missing_env("TRANSPORT_APP_ID");
        assert!(err.to_string().contains("TRANSPORT_APP_ID"));
    }
}
