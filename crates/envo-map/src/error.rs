//! Error types for the reasoning collaborator.

use thiserror::Error;

/// Errors raised while asking the reasoning model for a decision.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReasoningError {
    #[error("network error: {0}")]
    Network(String),

    #[error("reasoning API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("reasoning API returned no choices")]
    EmptyResponse,

    #[error("reasoning client is not configured: {0}")]
    Config(String),
}

impl ReasoningError {
    /// Returns whether this error is potentially recoverable with a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ReasoningError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ReasoningError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse(err.to_string())
    }
}

/// Result type alias for reasoning calls.
pub type Result<T> = std::result::Result<T, ReasoningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ReasoningError::Network("reset".to_string()).is_retryable());
        assert!(
            ReasoningError::Status {
                status: 429,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ReasoningError::Status {
                status: 401,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!ReasoningError::EmptyResponse.is_retryable());
    }
}
