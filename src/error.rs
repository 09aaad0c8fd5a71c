//! Error types produced by this crate.
//!
//! [`Error`] is the single error surface for every public operation. Storage
//! failures from redb are folded into [`Error::Storage`] via `From` impls for
//! each of redb's distinct error types, mirroring how the index crate this
//! module is grounded on collects `EncodeError`/`DecodeError`/`io::Error`
//! into one `IndexError`.

use thiserror::Error;

/// Errors surfaced by the store, transaction, bucket, and query APIs.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// `put` was called with a value that is not a JSON object, or is not
    /// valid JSON at all. The write is a no-op; the ambient transaction may
    /// continue.
    #[error("value is not a JSON object: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The top-level JSON value parsed successfully but was not an object
    /// (e.g. an array or a scalar).
    #[error("top-level JSON value must be an object")]
    NotAJsonObject,

    /// The underlying redb engine reported an error. The ambient transaction
    /// must be rolled back by the caller.
    #[error("storage error: {0}")]
    Storage(String),

    /// A bucket's data namespace exists without its matching index-root
    /// marker namespace, or vice versa. Fatal for that bucket: the on-disk
    /// layout is corrupt.
    #[error("bucket '{0}' has inconsistent data/index namespaces (corruption)")]
    SchemaMismatch(String),

    /// The store was opened in read-only mode against a path that does not
    /// exist.
    #[error("read-only mode requires an existing database file")]
    ReadOnlyRequiresExistingFile,

    /// An index row's encoded key could not be decoded; the value bytes
    /// extraction hit a tag or layout it does not recognize.
    #[error("corrupt index key: {0}")]
    CorruptIndexKey(String),
}

/// Convenience alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidJson(e)
    }
}

impl From<redb::DatabaseError> for Error {
    fn from(e: redb::DatabaseError) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<redb::TransactionError> for Error {
    fn from(e: redb::TransactionError) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<redb::TableError> for Error {
    fn from(e: redb::TableError) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<redb::StorageError> for Error {
    fn from(e: redb::StorageError) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<redb::CommitError> for Error {
    fn from(e: redb::CommitError) -> Self {
        Error::Storage(e.to_string())
    }
}
