//! Error and result types shared by every layer of the index.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, writing or querying an index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// On-disk bytes that do not decode to a valid page, record or header.
    #[error("Corrupted index: {0}")]
    Corrupted(String),

    #[error("Index is closed")]
    Closed,

    #[error("Index is opened read-only")]
    ReadOnly,

    #[error("Record id {id} out of bounds (page holds {count} records)")]
    OutOfBounds { id: usize, count: usize },

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Index already exists at {0:?}")]
    AlreadyExists(PathBuf),
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

impl From<bincode::error::EncodeError> for IndexError {
    fn from(err: bincode::error::EncodeError) -> Self {
        IndexError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for IndexError {
    fn from(err: bincode::error::DecodeError) -> Self {
        IndexError::Serialization(err.to_string())
    }
}
