//! Error types for smartlease

use thiserror::Error;

/// Result type alias using SmartLeaseError
pub type Result<T> = std::result::Result<T, SmartLeaseError>;

/// Error type alias for convenience
pub type Error = SmartLeaseError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const DUPLICATE: i32 = 4;
}

/// Main error type for smartlease
#[derive(Debug, Error)]
pub enum SmartLeaseError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Property ID '{0}' already exists")]
    DuplicateProperty(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding service or store failure while answering a search.
    /// Fatal for the request and never retried internally.
    #[error("Retrieval failed during {stage}: {source}")]
    Retrieval {
        stage: &'static str,
        #[source]
        source: Box<SmartLeaseError>,
    },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SmartLeaseError {
    /// Wrap an error as a retrieval failure for the given pipeline stage
    pub fn retrieval(stage: &'static str, source: impl Into<SmartLeaseError>) -> Self {
        Self::Retrieval {
            stage,
            source: Box::new(source.into()),
        }
    }

    /// Whether this error aborted retrieval (store or embedding service)
    pub fn is_retrieval_failure(&self) -> bool {
        matches!(self, Self::Retrieval { .. })
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PropertyNotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::DuplicateProperty(_) => exit_codes::DUPLICATE,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            SmartLeaseError::DuplicateProperty("p1".into()).exit_code(),
            exit_codes::DUPLICATE
        );
        assert_eq!(
            SmartLeaseError::InvalidInput("empty".into()).exit_code(),
            exit_codes::INVALID_INPUT
        );
        assert_eq!(
            SmartLeaseError::ExternalError("down".into()).exit_code(),
            exit_codes::GENERAL_ERROR
        );
    }

    #[test]
    fn test_retrieval_wraps_source() {
        let err = SmartLeaseError::retrieval(
            "query embedding",
            SmartLeaseError::ExternalError("connection refused".into()),
        );
        assert!(err.is_retrieval_failure());
        let msg = err.to_string();
        assert!(msg.contains("query embedding"));
        assert!(msg.contains("connection refused"));
    }
}
