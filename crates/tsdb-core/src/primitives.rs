//! # Primitives
//!
//! The stored record and the sentinels that mark a missing observation.

use serde::{Deserialize, Serialize};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Meta id of an ordinary observed value.
pub const DEFAULT_META_ID: i32 = 0;

/// Value stored in place of a missing observation.
pub const MISSING_VALUE: f64 = -9999.0;

/// Meta id stored with a missing observation.
pub const METADATA_MISSING_VALUE: i32 = 9999;

/// Size in bytes of one data file record.
pub const RECORD_SIZE: usize = 20;

/// Size in bytes of one change log entry.
pub const LOG_ENTRY_SIZE: usize = 28;

// =============================================================================
// RECORD
// =============================================================================

/// One stored observation.
///
/// `time` is seconds since the Unix epoch (UTC). A record is missing
/// when its meta id is [`METADATA_MISSING_VALUE`]; its value is then
/// [`MISSING_VALUE`] and carries no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub time: i64,
    pub value: f64,
    pub meta: i32,
}

impl Record {
    /// Record for an observed value. NaN is stored as missing.
    #[must_use]
    pub fn observed(time: i64, value: f64) -> Self {
        if value.is_nan() {
            return Self::missing(time);
        }
        Self {
            time,
            value,
            meta: DEFAULT_META_ID,
        }
    }

    /// Record for a missing observation.
    #[must_use]
    pub fn missing(time: i64) -> Self {
        Self {
            time,
            value: MISSING_VALUE,
            meta: METADATA_MISSING_VALUE,
        }
    }

    /// Record from an optional value.
    #[must_use]
    pub fn from_option(time: i64, value: Option<f64>) -> Self {
        match value {
            Some(v) => Self::observed(time, v),
            None => Self::missing(time),
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.meta == METADATA_MISSING_VALUE
    }

    /// The value, or `None` for a missing record.
    #[must_use]
    pub fn as_option(&self) -> Option<f64> {
        if self.is_missing() {
            None
        } else {
            Some(self.value)
        }
    }

    /// Whether writing `value` over this record would leave it unchanged.
    ///
    /// Two missing observations are equal; meta ids of observed values
    /// are not compared.
    #[must_use]
    pub fn holds(&self, value: Option<f64>) -> bool {
        match (self.as_option(), value) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// One change log entry: a record and when it was written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub record: Record,
    pub replaced_at: i64,
}
