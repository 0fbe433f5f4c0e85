//! # Series Module
//!
//! In-memory time series: an ordered map from UTC instant to an optional
//! value. `None` is a missing observation.
//!
//! Instants have whole-second resolution, the resolution of stored
//! records. Sub-second parts are truncated on insertion.

use crate::error::{DataError, Result};
use crate::primitives::Record;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An ordered time series.
///
/// NaN values are normalised to `None` on insertion so a missing
/// observation has exactly one representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<DateTime<Utc>, Option<f64>>",
    into = "BTreeMap<DateTime<Utc>, Option<f64>>"
)]
pub struct TimeSeries {
    points: BTreeMap<DateTime<Utc>, Option<f64>>,
}

impl TimeSeries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(instant, value)` pairs. Later duplicates win.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, Option<f64>)>,
    {
        let mut series = Self::new();
        for (time, value) in points {
            series.insert(time, value);
        }
        series
    }

    /// Build from parallel date and value lists (dates at midnight UTC).
    pub fn from_dates(dates: &[NaiveDate], values: &[Option<f64>]) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(DataError::LengthMismatch {
                dates: dates.len(),
                values: values.len(),
            }
            .into());
        }
        Ok(Self::from_points(
            dates
                .iter()
                .zip(values)
                .map(|(date, value)| (midnight(*date), *value)),
        ))
    }

    /// Build from stored records.
    pub fn from_records(records: &[Record]) -> Result<Self> {
        let mut series = Self::new();
        for record in records {
            series.insert(instant(record.time)?, record.as_option());
        }
        Ok(series)
    }

    /// Insert or replace one point. Points within the same second
    /// replace each other.
    pub fn insert(&mut self, time: DateTime<Utc>, value: Option<f64>) {
        self.points
            .insert(time.trunc_subsecs(0), value.filter(|v| !v.is_nan()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at `time`: outer `None` when no point exists there.
    #[must_use]
    pub fn get(&self, time: &DateTime<Utc>) -> Option<Option<f64>> {
        self.points.get(&time.trunc_subsecs(0)).copied()
    }

    #[must_use]
    pub fn first(&self) -> Option<(DateTime<Utc>, Option<f64>)> {
        self.points.first_key_value().map(|(k, v)| (*k, *v))
    }

    #[must_use]
    pub fn last(&self) -> Option<(DateTime<Utc>, Option<f64>)> {
        self.points.last_key_value().map(|(k, v)| (*k, *v))
    }

    /// Points in ascending time order.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, Option<f64>)> + '_ {
        self.points.iter().map(|(k, v)| (*k, *v))
    }

    /// Values in ascending time order.
    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.values().copied()
    }

    /// Number of points holding a value.
    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.points.values().filter(|v| v.is_some()).count()
    }

    /// Convert to records in time order.
    pub fn to_records(&self) -> Vec<Record> {
        self.iter()
            .map(|(time, value)| Record::from_option(time.timestamp(), value))
            .collect()
    }
}

impl From<BTreeMap<DateTime<Utc>, Option<f64>>> for TimeSeries {
    fn from(points: BTreeMap<DateTime<Utc>, Option<f64>>) -> Self {
        Self::from_points(points)
    }
}

impl From<TimeSeries> for BTreeMap<DateTime<Utc>, Option<f64>> {
    fn from(series: TimeSeries) -> Self {
        series.points
    }
}

impl FromIterator<(DateTime<Utc>, Option<f64>)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, Option<f64>)>>(iter: I) -> Self {
        Self::from_points(iter)
    }
}

/// Midnight UTC of a calendar date.
#[must_use]
pub fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Instant for a stored timestamp.
pub fn instant(seconds: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| DataError::OutOfRange(seconds).into())
}
