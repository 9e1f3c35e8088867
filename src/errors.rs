//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the case-retrieval engine, providing the
//! error taxonomy shared by index construction, search, prediction and the
//! evaluation harness.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from engine components
//! - **Output**: Structured error types with context for logging and reports
//! - **Error Categories**: Caller errors, index preconditions, embedding,
//!   corpus/query input, configuration
//!
//! ## Key Features
//! - `InvalidArgument` and `EmptyIndex` as the caller-facing taxonomy
//! - Per-item embedding failures carry a text preview for diagnosis
//! - Missing outcomes are *not* errors anywhere in this enum; they are
//!   sentinel data handled by the predictor

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Error types for the case-retrieval engine
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Caller supplied an invalid parameter (bad `k`, mismatched vector
    /// dimension, unknown aggregation method). Surfaced immediately, never
    /// retried.
    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument { argument: String, reason: String },

    /// The corpus produced zero embeddable records; fatal to any retrieval
    /// attempt. Carries the number of records skipped during the build for
    /// diagnosis.
    #[error("Case index is empty ({skipped_records} records were skipped during build)")]
    EmptyIndex { skipped_records: usize },

    /// A single text failed to encode. Isolated per item: during index build
    /// the record is skipped, during evaluation the query is recorded as
    /// failed.
    #[error("Embedding generation failed: {text_preview} - {reason}")]
    EmbeddingFailed {
        text_preview: String,
        reason: String,
    },

    /// The corpus input file violated the structured-record contract
    #[error("Invalid corpus format in {file}: {details}")]
    CorpusFormat { file: String, details: String },

    /// The persisted query file could not be read or parsed
    #[error("Query file error in {file}: {details}")]
    QueryFile { file: String, details: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RetrievalError {
    /// Whether the error is the caller's fault rather than an engine or
    /// input-data condition. Caller errors are never retried.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, RetrievalError::InvalidArgument { .. })
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            RetrievalError::InvalidArgument { .. } => "caller",
            RetrievalError::EmptyIndex { .. } => "index",
            RetrievalError::EmbeddingFailed { .. } => "embedding",
            RetrievalError::CorpusFormat { .. } => "corpus",
            RetrievalError::QueryFile { .. } => "evaluation",
            RetrievalError::Config { .. } => "configuration",
            RetrievalError::Io(_) | RetrievalError::Json(_) | RetrievalError::Toml(_) => "io",
            RetrievalError::Internal { .. } => "generic",
        }
    }

    /// Shorthand for an `InvalidArgument` error
    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        RetrievalError::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}

// Helper macro for internal errors with formatting
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::errors::RetrievalError::Internal {
            message: $msg.to_string(),
        }
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::RetrievalError::Internal {
            message: format!($fmt, $($arg)*),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = RetrievalError::invalid_argument("k", "must be >= 1");
        assert_eq!(err.category(), "caller");
        assert!(err.is_caller_error());

        let err = RetrievalError::EmptyIndex { skipped_records: 3 };
        assert_eq!(err.category(), "index");
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_empty_index_message_carries_skip_count() {
        let err = RetrievalError::EmptyIndex { skipped_records: 7 };
        assert!(err.to_string().contains('7'));
    }
}
