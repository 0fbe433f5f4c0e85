//! # Change Log Module
//!
//! Append-only history of every value written to an instance.
//!
//! Each write appends the records it created together with the time of
//! the write. Replaying the entries up to an instant reconstructs the
//! series as it was stored at that instant.

use crate::error::Result;
use crate::formats::{decode_log_entries, encode_log_entry, encode_log_header};
use crate::primitives::{LogEntry, Record};
use crate::series::{TimeSeries, instant};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::debug;

/// Append `records` to the log at `path`, stamped with `replaced_at`.
///
/// The log is created with its header on first use. An empty slice is
/// a no-op and does not create the file.
pub fn append(path: &Path, records: &[Record], replaced_at: i64) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut buf = Vec::new();
    if file.metadata()?.len() == 0 {
        buf.extend_from_slice(&encode_log_header());
    }
    for record in records {
        buf.extend_from_slice(&encode_log_entry(&LogEntry {
            record: *record,
            replaced_at,
        }));
    }
    file.write_all(&buf)?;
    file.sync_data()?;

    debug!(path = %path.display(), entries = records.len(), replaced_at, "appended change log");
    Ok(())
}

/// Every entry of the log in write order. An absent log is empty.
pub fn read(path: &Path) -> Result<Vec<LogEntry>> {
    match fs::read(path) {
        Ok(bytes) => decode_log_entries(&bytes, path),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

/// The series as stored at `at`: the latest value written at or before
/// `at` for each timestamp.
pub fn as_at(path: &Path, at: DateTime<Utc>) -> Result<TimeSeries> {
    replay(&read(path)?, at.timestamp())
}

/// Replay `entries` up to and including `cutoff` (seconds since epoch).
pub fn replay(entries: &[LogEntry], cutoff: i64) -> Result<TimeSeries> {
    let mut series = TimeSeries::new();
    for entry in entries.iter().filter(|e| e.replaced_at <= cutoff) {
        series.insert(instant(entry.record.time)?, entry.record.as_option());
    }
    Ok(series)
}
