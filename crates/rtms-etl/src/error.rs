//! Error types for the extraction job
//!
//! Nothing in the job recovers from an error: every variant aborts the run
//! and reaches the caller unchanged.

use thiserror::Error;

/// Result type alias for ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Error raised anywhere between the first page fetch and the upload
#[derive(Error, Debug)]
pub enum EtlError {
    /// Network, DNS, TLS or other transport fault while talking to the API
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a status other than 200
    #[error("API connection error (HTTP {status}): {message}")]
    Connection { status: u16, message: String },

    /// Malformed XML or a response missing its expected structure
    #[error("Parse error: {0}")]
    Parse(String),

    /// A value could not be coerced to its column's declared type
    #[error("Cannot coerce value '{value}' in column '{column}' (row {row}) to {expected}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// The object store rejected or failed the write
    #[error("Failed to store object '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] rtms_common::CommonError),
}

impl EtlError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a storage error for the given object key
    pub fn storage(
        key: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Storage {
            key: key.into(),
            source: source.into(),
        }
    }
}

