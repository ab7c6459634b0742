//! Generation error types

/// Failures of a single generation call
///
/// Every variant is recovered by the session into the fixed apology
/// message; the detail only reaches the logs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Timed out after {0}s")]
    Timeout(u64),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::Status {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "Service returned 503: overloaded");

        assert_eq!(GenerationError::Timeout(45).to_string(), "Timed out after 45s");
        assert_eq!(GenerationError::Cancelled.to_string(), "Request cancelled");
    }
}
