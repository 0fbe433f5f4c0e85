//! # Writer Module
//!
//! Smart writes of data files: only records whose value actually changes
//! are touched, and every touched record is reported so the caller can
//! log it.
//!
//! Regular series are written in place by slot (`slot * RECORD_SIZE`),
//! appended with missing records bridging any gap, or, when the new data
//! starts before the stored data, rewritten whole. Irregular series are
//! merged by timestamp and rewritten unless the new points all follow
//! the stored ones.
//!
//! Whole-file rewrites go through a `.backup` rename so a failed write
//! leaves the original file in place.

use crate::error::{DataError, Result};
use crate::formats::{encode_record, encode_records};
use crate::frequency::Frequency;
use crate::primitives::{RECORD_SIZE, Record};
use crate::reader::read_records;
use crate::series::{TimeSeries, instant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

// =============================================================================
// WRITE REPORT
// =============================================================================

/// Outcome of a write.
///
/// `created` holds every record that was written, new or changed, in
/// time order. `updated` holds the previous version of each changed
/// record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteReport {
    pub created: Vec<Record>,
    pub updated: Vec<Record>,
}

impl WriteReport {
    /// True when the write changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }

    fn change(&mut self, previous: Option<Record>, next: Record) {
        if let Some(previous) = previous {
            self.updated.push(previous);
        }
        self.created.push(next);
    }
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Write `series` into the data file at `path`.
///
/// Regular frequencies conform the series to their grid first, so slots
/// without a value are written as missing.
pub fn write(path: &Path, series: &TimeSeries, freq: Frequency) -> Result<WriteReport> {
    let series = freq.conform(series);
    if series.is_empty() {
        return Ok(WriteReport::default());
    }

    let existing = read_records(path)?;
    if existing.is_empty() {
        let records = series.to_records();
        write_file(path, &records)?;
        debug!(path = %path.display(), records = records.len(), "created data file");
        return Ok(WriteReport {
            created: records,
            updated: Vec::new(),
        });
    }

    if freq.is_regular() {
        write_regular(path, &series, freq, &existing)
    } else {
        write_irregular(path, &series, &existing)
    }
}

// =============================================================================
// REGULAR DATA
// =============================================================================

/// Write a conformed regular series over non-empty stored data.
fn write_regular(
    path: &Path,
    series: &TimeSeries,
    freq: Frequency,
    existing: &[Record],
) -> Result<WriteReport> {
    let (Some(first), Some(last)) = (existing.first(), existing.last()) else {
        return Ok(WriteReport::default());
    };
    let Some((start, _)) = series.first() else {
        return Ok(WriteReport::default());
    };
    let anchor = instant(first.time)?;
    let misaligned = || DataError::Misaligned {
        start: start.timestamp(),
        anchor: first.time,
    };

    if start < anchor {
        freq.periods_between(start, anchor).ok_or_else(misaligned)?;
        return prepend_regular(path, series, freq, existing, anchor);
    }

    let offset = freq
        .periods_between(anchor, start)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(misaligned)?;

    if start.timestamp() <= last.time {
        overwrite_regular(path, series, existing, offset)
    } else {
        append_regular(path, series, freq, instant(last.time)?)
    }
}

/// Overlapping write: changed slots are rewritten in place, slots past
/// the end are appended.
///
/// If a slot write fails, the slots already written are put back and
/// the file is cut to its old length before the error is returned.
fn overwrite_regular(
    path: &Path,
    series: &TimeSeries,
    existing: &[Record],
    offset: usize,
) -> Result<WriteReport> {
    let changes = plan_overwrite(series, existing, offset);
    if changes.is_empty() {
        return Ok(WriteReport::default());
    }

    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let original_len = file.metadata()?.len();

    if let Err(err) = write_slots(&mut file, changes.iter().map(|c| (c.slot, &c.next))) {
        error!(
            path = %path.display(),
            error = %err,
            "error overwriting data file, restoring previous records"
        );
        let restore = changes
            .iter()
            .filter_map(|c| c.previous.as_ref().map(|p| (c.slot, p)));
        write_slots(&mut file, restore)?;
        file.set_len(original_len)?;
        file.sync_data()?;
        return Err(err);
    }

    let mut report = WriteReport::default();
    for change in changes {
        report.change(change.previous, change.next);
    }
    debug!(
        path = %path.display(),
        created = report.created.len(),
        updated = report.updated.len(),
        "overwrote regular data"
    );
    Ok(report)
}

/// One slot to rewrite.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SlotChange {
    slot: usize,
    previous: Option<Record>,
    next: Record,
}

/// Slots whose stored record differs from the input, in slot order.
fn plan_overwrite(series: &TimeSeries, existing: &[Record], offset: usize) -> Vec<SlotChange> {
    series
        .iter()
        .enumerate()
        .filter_map(|(i, (time, value))| {
            let slot = offset.saturating_add(i);
            let previous = existing.get(slot).copied();
            if previous.is_some_and(|old| old.holds(value)) {
                return None;
            }
            Some(SlotChange {
                slot,
                previous,
                next: Record::from_option(time.timestamp(), value),
            })
        })
        .collect()
}

fn write_slots<'a>(
    file: &mut File,
    slots: impl IntoIterator<Item = (usize, &'a Record)>,
) -> Result<()> {
    for (slot, record) in slots {
        file.seek(SeekFrom::Start(slot.saturating_mul(RECORD_SIZE) as u64))?;
        file.write_all(&encode_record(record))?;
    }
    file.sync_data()?;
    Ok(())
}

/// Write starting after the stored data: bridge the gap with missing
/// records, then append.
fn append_regular(
    path: &Path,
    series: &TimeSeries,
    freq: Frequency,
    last: chrono::DateTime<chrono::Utc>,
) -> Result<WriteReport> {
    let Some((start, _)) = series.first() else {
        return Ok(WriteReport::default());
    };

    let mut records = Vec::new();
    let mut cursor = freq.advance(last, 1);
    while let Some(t) = cursor {
        if t >= start {
            break;
        }
        records.push(Record::missing(t.timestamp()));
        cursor = freq.advance(t, 1);
    }
    let gap = records.len();
    records.extend(series.to_records());

    append_file(path, &records)?;
    debug!(path = %path.display(), gap, records = records.len(), "appended regular data");
    Ok(WriteReport {
        created: records,
        updated: Vec::new(),
    })
}

/// Write starting before the stored data: rebuild the whole grid.
fn prepend_regular(
    path: &Path,
    series: &TimeSeries,
    freq: Frequency,
    existing: &[Record],
    anchor: chrono::DateTime<chrono::Utc>,
) -> Result<WriteReport> {
    let mut merged: BTreeMap<i64, Record> = existing.iter().map(|r| (r.time, *r)).collect();
    let mut report = WriteReport::default();

    for (time, value) in series.iter() {
        let record = Record::from_option(time.timestamp(), value);
        let previous = merged.get(&record.time).copied();
        if previous.is_some_and(|old| old.holds(value)) {
            continue;
        }
        merged.insert(record.time, record);
        report.change(previous, record);
    }

    if let Some((end, _)) = series.last() {
        let mut cursor = freq.advance(end, 1);
        while let Some(t) = cursor {
            if t >= anchor {
                break;
            }
            let record = Record::missing(t.timestamp());
            merged.insert(record.time, record);
            report.created.push(record);
            cursor = freq.advance(t, 1);
        }
    }

    report.created.sort_by_key(|r| r.time);
    let records: Vec<Record> = merged.into_values().collect();
    rewrite_file(path, &records)?;
    debug!(path = %path.display(), records = records.len(), "prepended regular data");
    Ok(report)
}

// =============================================================================
// IRREGULAR DATA
// =============================================================================

/// Merge an irregular series into non-empty stored data.
fn write_irregular(path: &Path, series: &TimeSeries, existing: &[Record]) -> Result<WriteReport> {
    let mut merged: BTreeMap<i64, Record> = existing.iter().map(|r| (r.time, *r)).collect();
    let mut report = WriteReport::default();

    for (time, value) in series.iter() {
        let record = Record::from_option(time.timestamp(), value);
        let previous = merged.get(&record.time).copied();
        if previous.is_some_and(|old| old.holds(value)) {
            continue;
        }
        merged.insert(record.time, record);
        report.change(previous, record);
    }

    if report.is_empty() {
        return Ok(report);
    }

    let last_stored = existing.last().map_or(i64::MIN, |r| r.time);
    let append_only = series
        .first()
        .is_some_and(|(start, _)| start.timestamp() > last_stored);

    if append_only {
        append_file(path, &report.created)?;
    } else {
        let records: Vec<Record> = merged.into_values().collect();
        rewrite_file(path, &records)?;
    }

    debug!(
        path = %path.display(),
        append_only,
        created = report.created.len(),
        updated = report.updated.len(),
        "wrote irregular data"
    );
    Ok(report)
}

// =============================================================================
// FILE HELPERS
// =============================================================================

fn write_file(path: &Path, records: &[Record]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&encode_records(records))?;
    writer.flush()?;
    writer.get_ref().sync_data()?;
    Ok(())
}

fn append_file(path: &Path, records: &[Record]) -> Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(&encode_records(records))?;
    file.sync_data()?;
    Ok(())
}

/// Replace the file at `path`, keeping the original until the new one is
/// fully written.
fn rewrite_file(path: &Path, records: &[Record]) -> Result<()> {
    let backup = backup_path(path);
    fs::rename(path, &backup)?;

    match write_file(path, records) {
        Ok(()) => {
            fs::remove_file(&backup)?;
            Ok(())
        }
        Err(err) => {
            error!(
                path = %path.display(),
                error = %err,
                "error rewriting data file, no data change made"
            );
            fs::rename(&backup, path)?;
            Err(err)
        }
    }
}

/// `<path>.backup`
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".backup");
    PathBuf::from(name)
}

// =============================================================================
// TESTS
// =============================================================================
