//! Change log layout.
//!
//! ```text
//! header   8 bytes  magic "TSDBLOG\0"
//!          4 bytes  u32 format version
//! entries  28 bytes each:
//!   offset 0   i64  time of the observation
//!   offset 8   f64  value
//!   offset 16  i32  meta id
//!   offset 20  i64  replacement time (when the value was written)
//! ```

use super::data_file::take;
use crate::error::{Result, TsdbError};
use crate::primitives::{LOG_ENTRY_SIZE, LogEntry, Record};
use std::path::Path;

/// Magic bytes opening every change log.
pub const LOG_MAGIC: [u8; 8] = *b"TSDBLOG\0";

/// Current change log format version.
pub const LOG_VERSION: u32 = 1;

/// Size of the change log header.
pub const LOG_HEADER_SIZE: usize = 12;

/// Header bytes of a new change log.
#[must_use]
pub fn encode_log_header() -> [u8; LOG_HEADER_SIZE] {
    let mut out = [0u8; LOG_HEADER_SIZE];
    out[0..8].copy_from_slice(&LOG_MAGIC);
    out[8..12].copy_from_slice(&LOG_VERSION.to_le_bytes());
    out
}

/// Encode one log entry.
#[must_use]
pub fn encode_log_entry(entry: &LogEntry) -> [u8; LOG_ENTRY_SIZE] {
    let mut out = [0u8; LOG_ENTRY_SIZE];
    out[0..8].copy_from_slice(&entry.record.time.to_le_bytes());
    out[8..16].copy_from_slice(&entry.record.value.to_le_bytes());
    out[16..20].copy_from_slice(&entry.record.meta.to_le_bytes());
    out[20..28].copy_from_slice(&entry.replaced_at.to_le_bytes());
    out
}

/// Decode a whole change log, header included.
pub fn decode_log_entries(bytes: &[u8], path: &Path) -> Result<Vec<LogEntry>> {
    if bytes.len() < LOG_HEADER_SIZE || bytes[0..8] != LOG_MAGIC {
        return Err(TsdbError::corrupt(path, "missing change log header"));
    }
    let version = u32::from_le_bytes(take(bytes, 8));
    if version != LOG_VERSION {
        return Err(TsdbError::corrupt(
            path,
            format!("unsupported change log version {version}"),
        ));
    }

    let body = &bytes[LOG_HEADER_SIZE..];
    if body.len() % LOG_ENTRY_SIZE != 0 {
        return Err(TsdbError::corrupt(path, "truncated change log entry"));
    }

    Ok(body
        .chunks_exact(LOG_ENTRY_SIZE)
        .map(|chunk| LogEntry {
            record: Record {
                time: i64::from_le_bytes(take(chunk, 0)),
                value: f64::from_le_bytes(take(chunk, 8)),
                meta: i32::from_le_bytes(take(chunk, 16)),
            },
            replaced_at: i64::from_le_bytes(take(chunk, 20)),
        })
        .collect())
}
