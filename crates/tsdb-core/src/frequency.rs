//! # Frequency Module
//!
//! Sampling frequencies of stored series, written the way pandas offset
//! aliases are: `D`, `15T`, `H`, `MS`, ... plus `IRR` for series without
//! a grid.
//!
//! A regular frequency defines a grid anchored at the first stored
//! record. Writes are conformed to that grid before they touch a file.

use crate::error::{Result, TsdbError};
use crate::series::{TimeSeries, midnight};
use chrono::{DateTime, Datelike, Months, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

// =============================================================================
// FIXED UNITS
// =============================================================================

/// Units of fixed-length frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FixedUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl FixedUnit {
    /// Length of one unit in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
            Self::Week => 604_800,
        }
    }

    const fn code(self) -> &'static str {
        match self {
            Self::Second => "S",
            Self::Minute => "T",
            Self::Hour => "H",
            Self::Day => "D",
            Self::Week => "W",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" | "s" => Some(Self::Second),
            "T" | "min" => Some(Self::Minute),
            "H" | "h" => Some(Self::Hour),
            "D" | "d" => Some(Self::Day),
            "W" | "w" => Some(Self::Week),
            _ => None,
        }
    }
}

// =============================================================================
// FREQUENCY
// =============================================================================

/// Sampling frequency of a timeseries instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// No grid; every timestamp is stored as given.
    Irregular,
    /// `count` units apart.
    Fixed { unit: FixedUnit, count: u32 },
    /// First day of each calendar month at midnight UTC.
    MonthStart,
    /// First day of each calendar year at midnight UTC.
    YearStart,
}

impl Frequency {
    /// Daily frequency, the most common one for station data.
    pub const DAILY: Self = Self::Fixed {
        unit: FixedUnit::Day,
        count: 1,
    };

    #[must_use]
    pub fn is_regular(&self) -> bool {
        !matches!(self, Self::Irregular)
    }

    /// Move `n` grid steps from `t`. `None` for irregular data or overflow.
    #[must_use]
    pub fn advance(&self, t: DateTime<Utc>, n: i64) -> Option<DateTime<Utc>> {
        match self {
            Self::Irregular => None,
            Self::Fixed { unit, count } => {
                let step = unit.seconds().checked_mul(i64::from(*count))?;
                let delta = TimeDelta::try_seconds(step.checked_mul(n)?)?;
                t.checked_add_signed(delta)
            }
            Self::MonthStart => shift_months(t, n),
            Self::YearStart => shift_months(t, n.checked_mul(12)?),
        }
    }

    /// Number of steps from `a` to `b`, if `b` lies on the grid anchored at `a`.
    #[must_use]
    pub fn periods_between(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> Option<i64> {
        match self {
            Self::Irregular => None,
            Self::Fixed { unit, count } => {
                let step = unit.seconds().checked_mul(i64::from(*count))?;
                let diff = b.timestamp().checked_sub(a.timestamp())?;
                if diff.checked_rem(step)? == 0 {
                    diff.checked_div(step)
                } else {
                    None
                }
            }
            Self::MonthStart => {
                let n = month_index(b).checked_sub(month_index(a))?;
                (self.advance(a, n)? == b).then_some(n)
            }
            Self::YearStart => {
                let n = i64::from(b.year()).checked_sub(i64::from(a.year()))?;
                (self.advance(a, n)? == b).then_some(n)
            }
        }
    }

    /// First grid boundary at or after `t`.
    ///
    /// Fixed frequencies are anchored at the data itself, so `t` is
    /// already a boundary. Calendar frequencies roll forward.
    #[must_use]
    pub fn align(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Irregular | Self::Fixed { .. } => Some(t),
            Self::MonthStart => {
                let start = NaiveDate::from_ymd_opt(t.year(), t.month(), 1).map(midnight)?;
                if start == t {
                    Some(t)
                } else {
                    shift_months(start, 1)
                }
            }
            Self::YearStart => {
                let start = NaiveDate::from_ymd_opt(t.year(), 1, 1).map(midnight)?;
                if start == t {
                    Some(t)
                } else {
                    shift_months(start, 12)
                }
            }
        }
    }

    /// Put a series on this frequency's grid.
    ///
    /// The grid runs from the first (aligned) point to the last point.
    /// Grid slots without an input point become missing; input points
    /// off the grid are dropped with a warning. Irregular series are
    /// returned as is.
    pub fn conform(&self, series: &TimeSeries) -> TimeSeries {
        let (conformed, dropped) = self.conform_counted(series);
        if dropped > 0 {
            warn!(freq = %self, dropped, "dropped points off the frequency grid");
        }
        conformed
    }

    /// `conform`, also returning how many input points were dropped.
    fn conform_counted(&self, series: &TimeSeries) -> (TimeSeries, usize) {
        if !self.is_regular() {
            return (series.clone(), 0);
        }
        let (Some((first, _)), Some((last, _))) = (series.first(), series.last()) else {
            return (TimeSeries::new(), 0);
        };

        let mut conformed = TimeSeries::new();
        let mut kept = 0usize;
        let mut cursor = self.align(first);
        while let Some(t) = cursor {
            if t > last {
                break;
            }
            let value = series.get(&t);
            if value.is_some() {
                kept = kept.saturating_add(1);
            }
            conformed.insert(t, value.flatten());
            cursor = self.advance(t, 1);
        }
        (conformed, series.len().saturating_sub(kept))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Irregular => f.write_str("IRR"),
            Self::Fixed { unit, count: 1 } => f.write_str(unit.code()),
            Self::Fixed { unit, count } => write!(f, "{}{}", count, unit.code()),
            Self::MonthStart => f.write_str("MS"),
            Self::YearStart => f.write_str("AS"),
        }
    }
}

impl FromStr for Frequency {
    type Err = TsdbError;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if text.eq_ignore_ascii_case("IRR") {
            return Ok(Self::Irregular);
        }

        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (digits, code) = text.split_at(split);
        let count = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| TsdbError::InvalidFrequency(s.to_string()))?
        };
        if count == 0 {
            return Err(TsdbError::InvalidFrequency(s.to_string()));
        }

        match code {
            "MS" if count == 1 => Ok(Self::MonthStart),
            "AS" | "YS" if count == 1 => Ok(Self::YearStart),
            _ => FixedUnit::from_code(code)
                .map(|unit| Self::Fixed { unit, count })
                .ok_or_else(|| TsdbError::InvalidFrequency(s.to_string())),
        }
    }
}

// =============================================================================
// CALENDAR HELPERS
// =============================================================================

fn month_index(t: DateTime<Utc>) -> i64 {
    i64::from(t.year()) * 12 + i64::from(t.month0())
}

fn shift_months(t: DateTime<Utc>, n: i64) -> Option<DateTime<Utc>> {
    let months = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
    if n >= 0 {
        t.checked_add_months(months)
    } else {
        t.checked_sub_months(months)
    }
}

// =============================================================================
// TESTS
// =============================================================================
