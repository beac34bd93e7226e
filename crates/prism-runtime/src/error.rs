//! Error types for the runtime client.

use thiserror::Error;

/// Represents an error that can occur when talking to the model runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// No configured endpoint was reachable. Lists every attempted
    /// endpoint so the caller can see the full sweep.
    #[error("unable to reach model runtime: {}", attempts.join("; "))]
    Unreachable {
        /// One `host -> cause` entry per attempted endpoint.
        attempts: Vec<String>,
    },

    /// The runtime answered with an error status.
    #[error("runtime API error ({status}): {message}")]
    Api {
        /// HTTP status returned by the runtime.
        status: u16,
        /// Error detail, parsed from the response body when possible.
        message: String,
    },

    /// A request-level failure after a connection was established,
    /// e.g. a broken generation stream.
    #[error("request error: {0}")]
    Request(String),

    /// An error occurred during serialization or deserialization.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RuntimeError {
    /// True when the error is a connectivity failure rather than an API
    /// response, i.e. the runtime never answered.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_lists_all_attempts() {
        let err = RuntimeError::Unreachable {
            attempts: vec![
                "http://a:11434 -> connection refused".to_string(),
                "http://b:11434 -> timed out".to_string(),
            ],
        };
        let msg = format!("{err}");
        assert!(msg.contains("http://a:11434"));
        assert!(msg.contains("http://b:11434"));
        assert!(err.is_unreachable());
    }

    #[test]
    fn api_error_display() {
        let err = RuntimeError::Api { status: 404, message: "model not found".to_string() };
        let msg = format!("{err}");
        assert!(msg.contains("404"));
        assert!(msg.contains("model not found"));
        assert!(!err.is_unreachable());
    }
}
