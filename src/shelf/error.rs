use crate::model::Failures;
use thiserror::Error;

/// Errors surfaced by the record service.
///
/// Store failures are classified at the [`crate::store::RecordStore`] boundary;
/// anything it cannot classify arrives here as [`ShelfError::Internal`].
#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("format not found: {0}")]
    FormatNotFound(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("record has ID")]
    RecordHasId,

    #[error("record doesn't have ID")]
    RecordDoesntHaveId,

    #[error("validation failed")]
    ValidationFailed(Failures),

    #[error("internal error: {0}")]
    Internal(#[from] StoreError),
}

/// Errors raised by a document backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("collection '{0}' has no text index")]
    NoTextIndex(String),

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("index already exists: {0}")]
    IndexExists(String),

    #[error("duplicate document id: {0}")]
    DuplicateId(String),

    #[error("invalid collection name: '{0}'")]
    InvalidCollection(String),
}

/// Errors in the startup configuration. All of them are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("field '{field}' references unknown format '{target}'")]
    UnknownReference { field: String, target: String },

    #[error("format '{0}' is defined more than once")]
    DuplicateFormat(String),

    #[error("format '{format}' marks '{field}' searchable but does not declare it")]
    UnknownSearchable { format: String, field: String },

    #[error("format '{format}' declares reserved field name '{field}'")]
    ReservedField { format: String, field: String },
}

/// Errors starting or feeding the web server.
#[derive(Error, Debug)]
pub enum WebError {
    #[error("cannot listen on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template '{name}': {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

pub type Result<T> = std::result::Result<T, ShelfError>;
