//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Glossary term errors
//! - 3xx: Config errors
//! - 4xx: Search errors
//! - 5xx: Upstream capability errors (embedding provider, vector index)
//! - 6xx: Storage errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for robot mode output.
///
/// Each variant maps to a numeric code (e.g., `TermNotFound` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Term errors (1xx)
    // ========================================
    /// E101: Requested glossary term was not found
    TermNotFound,
    /// E102: Term record is malformed (empty label, bad payload)
    TermInvalid,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,

    // ========================================
    // Search errors (4xx)
    // ========================================
    /// E401: Search query is unusable
    SearchQueryInvalid,

    // ========================================
    // Upstream errors (5xx)
    // ========================================
    /// E501: Embedding provider failed or is unreachable
    EmbeddingUnavailable,
    /// E502: Vector index query failed
    VectorSearchFailed,
    /// E503: HTTP transport error talking to an upstream service
    NetworkError,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E604: Database operation failed
    DatabaseError,
    /// E605: Serialization/deserialization failed
    SerializationError,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E906: IO operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `TermNotFound` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::TermNotFound => 101,
            Self::TermInvalid => 102,

            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,

            Self::SearchQueryInvalid => 401,

            Self::EmbeddingUnavailable => 501,
            Self::VectorSearchFailed => 502,
            Self::NetworkError => 503,

            Self::DatabaseError => 604,
            Self::SerializationError => 605,

            Self::IoError => 906,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::TermNotFound => "Run `finhub search <query>` to find related terms",
            Self::TermInvalid => "Check the term record: labels must be non-empty and examples valid JSON",

            Self::ConfigInvalid => "Run `finhub config` to see current values. Check TOML syntax in config file",
            Self::ConfigMissingRequired => "Set the missing value in config.toml or via its FINHUB_* environment variable",

            Self::SearchQueryInvalid => "Provide a non-empty query",

            Self::EmbeddingUnavailable => "Check [embedding] settings and the provider API key, or use backend = \"hash\"",
            Self::VectorSearchFailed => "Check [vector] settings; the index dimension must match [embedding].dims",
            Self::NetworkError => "Check network connectivity and the configured endpoint URL",

            Self::DatabaseError => "Check that [database].path points to a readable glossary database",
            Self::SerializationError => "The stored data may be corrupted. Check input data for validity",

            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::DatabaseError | Self::SerializationError
        )
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "term",
            3 => "config",
            4 => "search",
            5 => "upstream",
            6 => "storage",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::TermNotFound,
            Self::TermInvalid,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::SearchQueryInvalid,
            Self::EmbeddingUnavailable,
            Self::VectorSearchFailed,
            Self::NetworkError,
            Self::DatabaseError,
            Self::SerializationError,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn numeric_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ErrorCode::all() {
            assert!(seen.insert(code.numeric()), "duplicate code {code:?}");
        }
    }

    #[test]
    fn every_code_has_a_suggestion() {
        for code in ErrorCode::all() {
            assert!(!code.suggestion().is_empty(), "{code:?} has no suggestion");
        }
    }

    #[test]
    fn categories_follow_numeric_ranges() {
        assert_eq!(ErrorCode::TermNotFound.category(), "term");
        assert_eq!(ErrorCode::ConfigInvalid.category(), "config");
        assert_eq!(ErrorCode::EmbeddingUnavailable.category(), "upstream");
        assert_eq!(ErrorCode::DatabaseError.category(), "storage");
        assert_eq!(ErrorCode::IoError.category(), "internal");
    }

    #[test]
    fn display_uses_e_prefix() {
        assert_eq!(ErrorCode::VectorSearchFailed.to_string(), "E502");
    }

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::EmbeddingUnavailable).unwrap();
        assert_eq!(json, "\"EMBEDDING_UNAVAILABLE\"");
    }
}
