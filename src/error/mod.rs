//! Error handling for finhub.
//!
//! This module provides:
//! - [`FhError`]: The main error enum for all finhub operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Serializable error with suggestion and context

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

/// Main error type for finhub operations.
#[derive(Error, Debug)]
pub enum FhError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Term not found: {0}")]
    TermNotFound(String),

    #[error("Invalid term: {0}")]
    InvalidTerm(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector search failed: {0}")]
    VectorSearch(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FhError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) | Self::Serialization(_) => ErrorCode::SerializationError,
            Self::Http(_) => ErrorCode::NetworkError,
            Self::TermNotFound(_) => ErrorCode::TermNotFound,
            Self::InvalidTerm(_) => ErrorCode::TermInvalid,
            Self::InvalidQuery(_) => ErrorCode::SearchQueryInvalid,
            Self::EmbeddingUnavailable(_) => ErrorCode::EmbeddingUnavailable,
            Self::VectorSearch(_) => ErrorCode::VectorSearchFailed,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::TermNotFound(term) => Some(serde_json::json!({ "term": term })),
            Self::InvalidTerm(reason) => Some(serde_json::json!({ "reason": reason })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    /// Whether this error came from an external capability (store, embedding
    /// provider, vector index) rather than from caller input.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Http(_)
                | Self::EmbeddingUnavailable(_)
                | Self::VectorSearch(_)
        )
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "TERM_NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "term", "config", "upstream")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from an [`FhError`].
    #[must_use]
    pub fn from_error(err: &FhError) -> Self {
        let mut structured = Self::new(err.code(), err.to_string());
        structured.context = err.context();
        structured
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&FhError> for StructuredError {
    fn from(err: &FhError) -> Self {
        Self::from_error(err)
    }
}

/// Result type alias using FhError.
pub type Result<T> = std::result::Result<T, FhError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            FhError::TermNotFound("Hedging".into()).code(),
            ErrorCode::TermNotFound
        );
        assert_eq!(FhError::Config("bad".into()).code(), ErrorCode::ConfigInvalid);
        assert_eq!(
            FhError::EmbeddingUnavailable("timeout".into()).code(),
            ErrorCode::EmbeddingUnavailable
        );
    }

    #[test]
    fn test_error_context() {
        let err = FhError::TermNotFound("Hedging".into());
        let ctx = err.context().unwrap();
        assert_eq!(ctx.get("term").unwrap(), "Hedging");
    }

    #[test]
    fn test_upstream_classification() {
        assert!(FhError::VectorSearch("down".into()).is_upstream());
        assert!(FhError::EmbeddingUnavailable("down".into()).is_upstream());
        assert!(!FhError::Config("bad".into()).is_upstream());
        assert!(!FhError::InvalidQuery("empty".into()).is_upstream());
    }

    #[test]
    fn test_structured_error_from_error() {
        let err = FhError::TermNotFound("Derivative".into());
        let structured = err.to_structured();

        assert_eq!(structured.code, ErrorCode::TermNotFound);
        assert_eq!(structured.numeric_code, 101);
        assert!(structured.message.contains("Derivative"));
        assert!(!structured.suggestion.is_empty());
        assert!(structured.recoverable);
        assert_eq!(structured.category, "term");
    }

    #[test]
    fn test_structured_error_serialization() {
        let err = StructuredError::new(ErrorCode::VectorSearchFailed, "index down");
        let json = serde_json::to_string(&err).unwrap();

        assert!(json.contains("VECTOR_SEARCH_FAILED"));
        assert!(json.contains("\"numeric_code\":502"));
        assert!(json.contains("\"category\":\"upstream\""));
        assert!(!json.contains("context"));
    }

    #[test]
    fn test_structured_error_display() {
        let err = StructuredError::new(ErrorCode::TermNotFound, "Term 'x' not found");
        let display = format!("{err}");
        assert!(display.contains("E101"));
    }
}
