//! Error types for the reference host.

use changedet_codec::CodecError;
use changedet_core::CoreError;
use thiserror::Error;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised by the in-memory database and entity manager.
#[derive(Debug, Error)]
pub enum HostError {
    /// Error from the change detector or the session interface.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Field type conversion failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// No table with this name exists.
    #[error("unknown table: {table}")]
    UnknownTable {
        /// Table name.
        table: String,
    },

    /// No row with this id exists.
    #[error("row {id} not found in {table}")]
    RowNotFound {
        /// Table searched.
        table: String,
        /// Row id.
        id: i64,
    },

    /// The field does not hold a date-time object.
    #[error("field {field} does not hold a date-time object")]
    NotADateTime {
        /// Field name.
        field: String,
    },
}

impl HostError {
    /// Creates an unknown table error.
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable {
            table: table.into(),
        }
    }

    /// Creates a row not found error.
    pub fn row_not_found(table: impl Into<String>, id: i64) -> Self {
        Self::RowNotFound {
            table: table.into(),
            id,
        }
    }
}
