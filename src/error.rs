//! Error types for the merge pipeline.
//!
//! Every failure falls into one of a few categories (see [`ErrorKind`]):
//! reading from the store, resolving a field against the schema, writing a
//! document downstream, or a malformed request.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DocMergeError>;

/// Coarse classification of a [`DocMergeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The store could not be read or a query was rejected.
    Lookup,
    /// A field has no schema entry or the schema itself is invalid.
    SchemaResolution,
    /// A document was rejected downstream.
    Write,
    /// The request itself is malformed.
    Request,
    /// Filesystem failure while loading configuration.
    Io,
}

#[derive(Error, Debug)]
pub enum DocMergeError {
    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Query parse error for \"{query}\": {detail}")]
    QueryParse { query: String, detail: String },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Document is missing unique key field '{0}'")]
    MissingUniqueKey(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocMergeError {
    pub fn lookup(msg: impl Into<String>) -> Self {
        DocMergeError::Lookup(msg.into())
    }

    pub fn query_parse(query: impl Into<String>, detail: impl Into<String>) -> Self {
        DocMergeError::QueryParse {
            query: query.into(),
            detail: detail.into(),
        }
    }

    pub fn unknown_field(name: impl Into<String>) -> Self {
        DocMergeError::UnknownField(name.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        DocMergeError::Schema(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        DocMergeError::Write(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        DocMergeError::InvalidArgument(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocMergeError::Lookup(_) | DocMergeError::QueryParse { .. } => ErrorKind::Lookup,
            DocMergeError::UnknownField(_) | DocMergeError::Schema(_) => {
                ErrorKind::SchemaResolution
            }
            DocMergeError::Write(_) => ErrorKind::Write,
            DocMergeError::MissingUniqueKey(_)
            | DocMergeError::InvalidArgument(_)
            | DocMergeError::Json(_) => ErrorKind::Request,
            DocMergeError::Io(_) => ErrorKind::Io,
        }
    }
}
