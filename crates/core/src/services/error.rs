//! Error types for remote service calls.

use thiserror::Error;

/// Errors returned by the remote service clients.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The remote rejected the credential (HTTP 401).
    #[error("unauthorized: {endpoint}")]
    Unauthorized { endpoint: String },

    /// Non-success HTTP status.
    #[error("HTTP {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Request timed out.
    #[error("request timed out: {endpoint}")]
    Timeout { endpoint: String },

    /// Could not reach the remote.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Response body could not be decoded.
    #[error("failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// Any other transport failure.
    #[error("request failed: {0}")]
    Request(String),
}

impl ServiceError {
    /// Map a reqwest error onto the taxonomy.
    pub fn from_reqwest(endpoint: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else if e.is_connect() {
            Self::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            Self::Decode {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        } else {
            Self::Request(e.to_string())
        }
    }

    /// Whether the credential was rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Whether this is a transient network condition.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::ConnectionFailed(_) | Self::Request(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let unauthorized = ServiceError::Unauthorized {
            endpoint: "session".into(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!unauthorized.is_transient());

        let timeout = ServiceError::Timeout {
            endpoint: "session".into(),
        };
        assert!(timeout.is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::Status {
            endpoint: "ticket".into(),
            status: 503,
            body: "down".into(),
        };
        assert_eq!(err.to_string(), "HTTP 503 from ticket: down");
    }
}
