//! Error types for air-unify services.

use thiserror::Error;

/// Result type alias using AirError.
pub type AirResult<T> = Result<T, AirError>;

/// Primary error type for air-quality operations.
#[derive(Debug, Error)]
pub enum AirError {
    // === Upstream Errors ===
    #[error("Upstream provider '{provider}' failed: {message}")]
    Upstream {
        provider: &'static str,
        message: String,
    },

    #[error("Upstream provider '{provider}' returned no usable payload")]
    EmptyUpstream { provider: &'static str },

    // === Storage Errors ===
    #[error("Database error: {0}")]
    Database(String),

    // === Request Errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    /// A well-formed query that legitimately has nothing to return.
    /// Not an error condition for callers; mapped to an empty response.
    #[error("No data available")]
    NoData,

    // === Infrastructure Errors ===
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AirError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            AirError::Upstream { .. } | AirError::EmptyUpstream { .. } => 502,
            AirError::InvalidParameter { .. } => 400,
            AirError::NoData => 204,
            AirError::ConfigMissing(_) => 503,
            AirError::Database(_) | AirError::Internal(_) => 500,
        }
    }

    /// True for the "nothing to return" outcome, which callers must be
    /// able to tell apart from a hard failure.
    pub fn is_no_data(&self) -> bool {
        matches!(self, AirError::NoData)
    }
}

impl From<serde_json::Error> for AirError {
    fn from(err: serde_json::Error) -> Self {
        AirError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_is_not_a_server_error() {
        assert_eq!(AirError::NoData.http_status_code(), 204);
        assert!(AirError::NoData.is_no_data());
        assert!(!AirError::Database("boom".into()).is_no_data());
    }

    #[test]
    fn upstream_maps_to_bad_gateway() {
        let err = AirError::Upstream {
            provider: "open-meteo",
            message: "timeout".into(),
        };
        assert_eq!(err.http_status_code(), 502);
    }
}
