//! Error types for the jwlmerge core library.
//!
//! Unresolved conflicts are not errors: they are returned as a normal result
//! shape by the merge functions. Everything here means the merge cannot
//! continue without the caller changing its input.

use thiserror::Error;

/// Errors that can occur during merge operations.
///
/// This enum is exposed to Swift/Kotlin via UniFFI as a flat error type,
/// meaning the error variants are exposed as simple enum cases with string messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Error))]
#[cfg_attr(feature = "uniffi", uniffi(flat_error))]
pub enum MergeError {
    /// Error serializing/deserializing JSON
    #[error("JSON error: {0}")]
    Json(String),

    /// A solver answered a conflict that already has a different answer.
    #[error("conflicting solutions for key {key}")]
    ConflictingSolution { key: String },

    /// The selected strategy cannot handle this conflict.
    #[error("strategy {strategy} cannot solve conflict {key}: {reason}")]
    UnsupportedStrategy {
        strategy: String,
        key: String,
        reason: String,
    },

    /// A last-modified timestamp could not be parsed.
    #[error("invalid timestamp {value:?} in conflict {key}")]
    InvalidTimestamp { key: String, value: String },

    /// A table array breaks the dense, id-indexed layout.
    #[error("table {table} holds id {id} at index {index}")]
    InvalidTable {
        table: String,
        index: usize,
        id: i64,
    },

    /// A highlight GUID survived the merge more often than can be explained.
    #[error("user mark {guid} appears {count} times after merge")]
    DuplicateUserMark { guid: String, count: usize },

    /// General error
    #[error("Error: {0}")]
    General(String),
}

impl From<serde_json::Error> for MergeError {
    fn from(err: serde_json::Error) -> Self {
        MergeError::Json(err.to_string())
    }
}

/// Result type alias for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;
