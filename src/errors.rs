//! Error types for fixbuddy
//!
//! Every retrieval-time failure has a variant here so components can log and
//! recover from it locally. Only configuration errors are meant to abort
//! startup.

use thiserror::Error;

/// Main error type for the retrieval core
#[derive(Error, Debug)]
pub enum FixError {
    /// Corpus file missing or unreadable
    #[error("Corpus unavailable at {path}: {reason}")]
    CorpusUnavailable { path: String, reason: String },

    /// Guide step enrichment failed or ran out of retries
    #[error("Remote guide {guideid} unavailable: {reason}")]
    RemoteGuideUnavailable { guideid: u64, reason: String },

    /// Upstream answered 429
    #[error("Rate limited by remote guide API (attempt {attempt})")]
    RateLimited { attempt: u32 },

    /// Query expander produced nothing usable
    #[error("Query expansion returned no usable queries")]
    EmptyExpansion,

    /// Threshold search returned nothing
    #[error("No relevant results for query: {0}")]
    NoRelevantResults(String),

    /// Embedding model errors
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// Query expansion backend errors
    #[error("Query expansion failed: {0}")]
    ExpansionError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Generic errors with context
    #[error("fixbuddy error: {0}")]
    Generic(String),
}

/// Result type alias for retrieval operations
pub type Result<T> = std::result::Result<T, FixError>;

/// Convert anyhow errors to FixError
impl From<anyhow::Error> for FixError {
    fn from(err: anyhow::Error) -> Self {
        FixError::Generic(format!("{:#}", err))
    }
}
