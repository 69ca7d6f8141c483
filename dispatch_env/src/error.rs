//! Error types for backend calls.

use thiserror::Error;

/// Any failure of a start/stop/restart/status/summary call.
///
/// The `Display` text is the cause surfaced to the user in the status log,
/// so variants carry the underlying message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Connection refused, reset, DNS failure, etc.
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status code
    #[error("Backend returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Response body could not be decoded
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Request did not complete in time
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Backend refused the command for a domain reason
    #[error("Rejected by backend: {0}")]
    Rejected(String),
}

impl BackendError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a rejection error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_cause() {
        let err = BackendError::network("connection refused");
        assert_eq!(err.to_string(), "Network error: connection refused");

        let err = BackendError::Status {
            code: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "Backend returned HTTP 503: busy");
    }
}
