//! Error types for every failure class the server distinguishes.
//!
//! Each enum maps to one branch of the protocol's status reporting: dataset
//! and database failures become the acquisition token, a missing stored run
//! becomes the reload token, and transport problems end the session without
//! a partial response.

use thiserror::Error;

/// Requested sample size cannot be satisfied by the dataset.
///
/// Raised by [`crate::dataset::Dataset::sample`] when `k` is zero or larger
/// than the number of distinct records, and propagated unchanged through
/// cluster seeding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sample size {requested} is out of range for {available} distinct records")]
pub struct OutOfRangeSampleSize {
    pub requested: usize,
    pub available: usize,
}

/// A provider snapshot that does not describe a usable dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("row {row} carries {found} values but the schema has {expected} columns")]
    WidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row}, column {column}: value kind does not match the declared domain")]
    KindMismatch { row: usize, column: usize },
}

/// Failures of the table-producing collaborator.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("cannot open database {path}: {source}")]
    Connection {
        path: String,
        source: rusqlite::Error,
    },
    #[error("no such table: {0}")]
    UnknownTable(String),
    #[error("table name {0:?} is not a plain identifier")]
    InvalidTableName(String),
    #[error("table {0} holds no rows")]
    EmptyTable(String),
    #[error("column {column} holds no usable value")]
    MissingValue { column: String },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Failures while saving or reloading a clustering run.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("no stored run at {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cluster set could not be encoded: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("stored run is unreadable: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Wire-level failures on either end of a session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("text block of {len} bytes exceeds the {max} byte limit")]
    TextTooLong { len: usize, max: usize },
    #[error("received text is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("unknown request kind {0}")]
    UnknownRequestKind(u32),
}

/// Client-side view of a failed request.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach the server: {0}")]
    Connect(std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("server refused the request: {0}")]
    Rejected(String),
    #[error("server rejected the cluster count")]
    InvalidClusterCount,
    #[error("unexpected server response {0:?}")]
    UnexpectedToken(String),
}
