//! # TSDB Core
//!
//! File-backed time-series storage engine.
//!
//! A database is a directory with a redb catalog and, for every
//! timeseries instance (identifier + measurand + source + frequency),
//! a fixed-width data file and an append-only change log.
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use tsdb_core::{Database, Frequency, InstanceKey, TimeSeries};
//!
//! # fn main() -> tsdb_core::Result<()> {
//! let db = Database::create("hydro_db")?;
//! db.add_measurand("Q", "STREAMFLOW", "Streamflow")?;
//! db.add_source("DATA_SOURCE", "")?;
//! db.add_timeseries("410730")?;
//!
//! let key = InstanceKey::new("410730", Frequency::DAILY, "Q", "DATA_SOURCE");
//! db.add_timeseries_instance(&key, "")?;
//!
//! let dates: Vec<NaiveDate> = (1..=3)
//!     .filter_map(|d| NaiveDate::from_ymd_opt(2014, 1, d))
//!     .collect();
//! let series = TimeSeries::from_dates(&dates, &[Some(1.0), Some(2.0), Some(3.0)])?;
//! db.write(&key, &series)?;
//! assert_eq!(db.read(&key)?, series);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod changelog;
pub mod database;
pub mod error;
pub mod formats;
pub mod frequency;
pub mod metadata;
pub mod primitives;
pub mod reader;
pub mod series;
pub mod storage;
pub mod writer;

pub use database::{DATA_DIR, Database};
pub use error::{DataError, Result, TsdbError};
pub use frequency::{FixedUnit, Frequency};
pub use metadata::{
    FileKind, InstanceFilter, InstanceKey, Measurand, Source, TimeseriesInstance,
    TimeseriesRecord,
};
pub use primitives::{
    DEFAULT_META_ID, LogEntry, METADATA_MISSING_VALUE, MISSING_VALUE, Record,
};
pub use series::TimeSeries;
pub use writer::WriteReport;

/// Crate version, reported by `tsdb --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
