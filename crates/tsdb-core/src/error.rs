//! # Error Module
//!
//! One error type for every engine operation.
//!
//! Catalog errors from redb arrive as five distinct types (database,
//! transaction, table, storage, commit). They are folded into the single
//! `redb::Error` umbrella so callers match on one variant.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, TsdbError>;

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum TsdbError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata catalog operation failed.
    #[error("catalog error: {0}")]
    Store(#[from] redb::Error),

    /// Catalog value could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    /// Target of a create operation already exists.
    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Database directory or catalog is absent.
    #[error("no database found at {0}")]
    NotFound(PathBuf),

    /// A catalog entry with the same key is already registered.
    #[error("duplicate {kind}: {key}")]
    Duplicate { kind: &'static str, key: String },

    /// A referenced catalog entry does not exist.
    #[error("unknown {kind}: {key}")]
    MissingData { kind: &'static str, key: String },

    /// Input data cannot be written as requested.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A data or log file does not follow its binary layout.
    #[error("corrupt file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Frequency string is not understood.
    #[error("invalid frequency '{0}'")]
    InvalidFrequency(String),
}

/// Problems with the series handed to a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// Series start is not on the grid of the stored data.
    #[error("series starting at {start} is not aligned with stored data starting at {anchor}")]
    Misaligned { start: i64, anchor: i64 },

    /// Dates and values were supplied with different lengths.
    #[error("got {dates} dates but {values} values")]
    LengthMismatch { dates: usize, values: usize },

    /// Timestamp falls outside the representable range.
    #[error("timestamp {0} is out of range")]
    OutOfRange(i64),
}

impl TsdbError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// REDB ERROR FOLDING
// =============================================================================

macro_rules! fold_redb_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for TsdbError {
                fn from(err: $source) -> Self {
                    Self::Store(redb::Error::from(err))
                }
            }
        )*
    };
}

fold_redb_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_is_transparent() {
        let err = TsdbError::from(DataError::LengthMismatch {
            dates: 3,
            values: 2,
        });
        assert_eq!(err.to_string(), "got 3 dates but 2 values");
    }

    #[test]
    fn duplicate_names_kind_and_key() {
        let err = TsdbError::Duplicate {
            kind: "measurand",
            key: "Q".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate measurand: Q");
    }
}
