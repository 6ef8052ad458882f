//! Error types for the crypto payment integration
//!
//! Failures are split by where they are detected: configuration problems and
//! precondition violations are raised before any network call, gateway errors
//! wrap whatever went wrong on the wire.

use thiserror::Error;

pub type IntegrationResult<T> = Result<T, IntegrationError>;

/// Generic text shown to the end customer whenever the gateway misbehaves.
pub const PAYMENT_UNAVAILABLE_MESSAGE: &str =
    "Payment processing is currently unavailable. Please try again later";

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Invalid integration configuration, failing fields: {}", fields.join(", "))]
    ConfigurationValidation { fields: Vec<String> },

    #[error("{key} cannot be null")]
    MissingKey { key: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl IntegrationError {
    pub fn validation(fields: Vec<String>) -> Self {
        Self::ConfigurationValidation { fields }
    }

    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Field names reported by a validation failure, empty for every other kind.
    pub fn error_fields(&self) -> &[String] {
        match self {
            Self::ConfigurationValidation { fields } => fields,
            _ => &[],
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Message safe to show outside the merchant back office.
    ///
    /// Validation failures are reported field by field to the merchant. Gateway
    /// failures collapse into [`PAYMENT_UNAVAILABLE_MESSAGE`] so no gateway
    /// internals reach the customer.
    pub fn customer_message(&self) -> String {
        match self {
            Self::ConfigurationValidation { fields } => {
                format!("The following fields are required: {}", fields.join(", "))
            }
            Self::Gateway(_) => PAYMENT_UNAVAILABLE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Failure of a single exchange with the remote gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Timeout error: gateway did not answer within {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Gateway answered with HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Invalid gateway response: {message}")]
    InvalidResponse { message: String },

    #[error("Gateway rejected the request: {message}")]
    Rejected { message: String },
}

impl GatewayError {
    pub fn transport(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Transient failures. Nothing in this crate retries them, the flag is for callers
    /// that deduplicate on the gateway transaction id.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status } => *status >= 500 || *status == 429,
            Self::InvalidResponse { .. } | Self::Rejected { .. } => false,
        }
    }
}

#[cfg(feature = "http-client")]
impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            GatewayError::HttpStatus {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            GatewayError::invalid_response(err.to_string())
        } else {
            GatewayError::transport("Request error", err)
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::invalid_response(format!("JSON error: {}", err))
    }
}
