//! # Ingest Formats
//!
//! Text formats the tools read series from and write series to:
//!
//! - ACORN-SAT daily files: a header line, then `YYYYMMDD value` rows
//!   with `99999.9` marking a missing day
//! - CSV: `time,value` rows, optional header, empty value = missing
//! - JSON: `{"points": [{"time": "...", "value": 1.0 | null}]}`

use crate::cli::{CliError, CliResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tsdb_core::TimeSeries;
use tsdb_core::series::midnight;

/// Missing-value marker of ACORN-SAT files.
pub const ACORN_MISSING: f64 = 99999.9;

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// Parse an RFC 3339 instant, `YYYY-MM-DD[ HH:MM:SS]` or `YYYYMMDD` (UTC).
pub fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(t.and_utc());
    }
    ["%Y-%m-%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(midnight)
}

fn parse_value(text: &str) -> Option<Option<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Some(None);
    }
    text.parse::<f64>().ok().map(|v| (!v.is_nan()).then_some(v))
}

fn bad_row(line: usize, reason: impl Into<String>) -> CliError {
    CliError::Parse {
        line,
        reason: reason.into(),
    }
}

// =============================================================================
// ACORN-SAT
// =============================================================================

/// Parse an ACORN-SAT daily file.
pub fn parse_acorn(text: &str) -> CliResult<TimeSeries> {
    let mut series = TimeSeries::new();
    for (index, row) in text.lines().enumerate().skip(1) {
        let line = index.saturating_add(1);
        let mut fields = row.split_whitespace();
        let (Some(date), Some(value)) = (fields.next(), fields.next()) else {
            if row.trim().is_empty() {
                continue;
            }
            return Err(bad_row(line, "expected 'YYYYMMDD value'"));
        };

        let date = NaiveDate::parse_from_str(date, "%Y%m%d")
            .map_err(|e| bad_row(line, format!("bad date '{date}': {e}")))?;
        let value: f64 = value
            .parse()
            .map_err(|e| bad_row(line, format!("bad value '{value}': {e}")))?;

        let value = (value != ACORN_MISSING).then_some(value);
        series.insert(midnight(date), value);
    }
    Ok(series)
}

// =============================================================================
// CSV
// =============================================================================

/// Parse `time,value` rows. A first row whose time does not parse is
/// taken as a header.
pub fn parse_csv(text: &str) -> CliResult<TimeSeries> {
    let mut series = TimeSeries::new();
    for (index, row) in text.lines().enumerate() {
        let line = index.saturating_add(1);
        if row.trim().is_empty() {
            continue;
        }
        let Some((time, value)) = row.split_once(',') else {
            return Err(bad_row(line, "expected 'time,value'"));
        };

        let Some(time) = parse_time(time) else {
            if index == 0 {
                continue;
            }
            return Err(bad_row(line, format!("bad time '{}'", time.trim())));
        };
        let value =
            parse_value(value).ok_or_else(|| bad_row(line, format!("bad value '{}'", value.trim())))?;
        series.insert(time, value);
    }
    Ok(series)
}

/// Render a series as CSV with a `time,value` header. Missing values are
/// left empty.
pub fn to_csv(series: &TimeSeries) -> String {
    let mut out = String::from("time,value\n");
    for (time, value) in series.iter() {
        out.push_str(&time.to_rfc3339_opts(SecondsFormat::Secs, true));
        out.push(',');
        if let Some(v) = value {
            out.push_str(&v.to_string());
        }
        out.push('\n');
    }
    out
}

// =============================================================================
// JSON
// =============================================================================

/// One point of a JSON series body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub time: DateTime<Utc>,
    pub value: Option<f64>,
}

/// JSON series body used by the HTTP API and JSON ingest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Points {
    pub points: Vec<Point>,
}

impl Points {
    pub fn from_series(series: &TimeSeries) -> Self {
        Self {
            points: series
                .iter()
                .map(|(time, value)| Point { time, value })
                .collect(),
        }
    }

    pub fn to_series(&self) -> TimeSeries {
        self.points.iter().map(|p| (p.time, p.value)).collect()
    }
}

/// Parse a JSON series body.
pub fn parse_json(text: &str) -> CliResult<TimeSeries> {
    let points: Points = serde_json::from_str(text)?;
    Ok(points.to_series())
}

// =============================================================================
// TESTS
// =============================================================================
