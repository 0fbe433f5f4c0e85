//! Data file records.
//!
//! A data file is a headerless run of fixed-width little-endian records
//! in ascending time order:
//!
//! ```text
//! offset 0   i64  time (seconds since epoch, UTC)
//! offset 8   f64  value
//! offset 16  i32  meta id
//! ```

use crate::error::{Result, TsdbError};
use crate::primitives::{RECORD_SIZE, Record};
use std::path::Path;

/// Encode one record.
#[must_use]
pub fn encode_record(record: &Record) -> [u8; RECORD_SIZE] {
    let mut out = [0u8; RECORD_SIZE];
    out[0..8].copy_from_slice(&record.time.to_le_bytes());
    out[8..16].copy_from_slice(&record.value.to_le_bytes());
    out[16..20].copy_from_slice(&record.meta.to_le_bytes());
    out
}

/// Encode a run of records.
#[must_use]
pub fn encode_records(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len().saturating_mul(RECORD_SIZE));
    for record in records {
        out.extend_from_slice(&encode_record(record));
    }
    out
}

/// Decode one record from exactly [`RECORD_SIZE`] bytes.
#[must_use]
pub fn decode_record(bytes: &[u8; RECORD_SIZE]) -> Record {
    Record {
        time: i64::from_le_bytes(take(bytes, 0)),
        value: f64::from_le_bytes(take(bytes, 8)),
        meta: i32::from_le_bytes(take(bytes, 16)),
    }
}

/// Decode a whole data file. `path` is only used for error context.
pub fn decode_records(bytes: &[u8], path: &Path) -> Result<Vec<Record>> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(TsdbError::corrupt(
            path,
            format!(
                "length {} is not a multiple of the {RECORD_SIZE}-byte record size",
                bytes.len()
            ),
        ));
    }
    Ok(bytes
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| decode_record(&take(chunk, 0)))
        .collect())
}

/// Copy `N` bytes starting at `at`. Callers guarantee the slice is long enough.
pub(crate) fn take<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}
