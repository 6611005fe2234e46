//! Error types for query parsing.

use thiserror::Error;

/// Errors that can occur while parsing a vector query response.
///
/// Individual unusable elements are skipped, never reported here; only a
/// document that cannot be read as a whole fails.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The document is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is valid JSON but not shaped like a query response.
    #[error("Malformed query document: {0}")]
    Malformed(String),
}

impl QueryError {
    /// Create a malformed-document error.
    pub fn malformed(message: impl Into<String>) -> Self {
        QueryError::Malformed(message.into())
    }
}
