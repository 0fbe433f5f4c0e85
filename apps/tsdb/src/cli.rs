//! # CLI Commands
//!
//! Command implementations shared by the `tsdb-create` and `tsdb-load`
//! binaries, plus the error type and logging setup used by every binary.

use crate::ingest;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tsdb_core::{Database, Frequency, InstanceKey, TsdbError};

// =============================================================================
// ERRORS
// =============================================================================

/// Errors raised by the command-line tools.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Db(#[from] TsdbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A row of an input file could not be parsed.
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// Bad arguments to a console command.
    #[error("usage: {0}")]
    Usage(String),
}

pub type CliResult<T> = Result<T, CliError>;

// =============================================================================
// LOGGING
// =============================================================================

/// Install the stderr subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// =============================================================================
// CREATE COMMAND
// =============================================================================

/// Create a new, empty database at `path`.
pub fn cmd_create(path: &Path) -> CliResult<()> {
    let db = Database::create(path)?;
    info!(path = %db, "database ready");
    Ok(())
}

// =============================================================================
// LOAD COMMAND (ACORN-SAT)
// =============================================================================

/// Default source id for ACORN-SAT data.
pub const ACORN_SOURCE: &str = "BOM_ACORN_SAT";

/// Measurands of the ACORN-SAT daily files: (short id, long id, description,
/// file-name tag).
pub const ACORN_MEASURANDS: [(&str, &str, &str, &str); 2] = [
    ("maxT", "MAXIMUM_TEMPERATURE", "Maximum Temperature", "maxT"),
    ("minT", "MINIMUM_TEMPERATURE", "Minimum Temperature", "minT"),
];

/// Options of `tsdb-load`.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Directory holding the downloaded `acorn.sat.*.daily.txt` files.
    pub data_dir: PathBuf,
    pub source: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            source: ACORN_SOURCE.to_string(),
        }
    }
}

/// What a load run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub stations: usize,
    pub files_loaded: usize,
    pub files_missing: usize,
    pub records_written: usize,
}

/// Path of the ACORN-SAT file for one station and measurand tag.
pub fn acorn_file(data_dir: &Path, tag: &str, station: &str) -> PathBuf {
    data_dir.join(format!("acorn.sat.{tag}.{station}.daily.txt"))
}

/// Station ids from a whitespace-separated list file (`stations.txt`).
pub fn read_station_list(path: &Path) -> CliResult<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text.split_whitespace().map(str::to_string).collect())
}

/// Load ACORN-SAT daily temperature files for `stations` into the database
/// at `db_path`, registering catalog entries as needed.
pub fn cmd_load(db_path: &Path, stations: &[String], options: &LoadOptions) -> CliResult<LoadSummary> {
    let db = Database::open(db_path)?;
    ensure_acorn_catalog(&db, &options.source)?;

    let mut summary = LoadSummary::default();
    let unique: BTreeSet<&str> = stations.iter().map(String::as_str).collect();

    for station in unique {
        ignore_duplicate(db.add_timeseries(station))?;
        summary.stations = summary.stations.saturating_add(1);

        for (measurand, _, _, tag) in ACORN_MEASURANDS {
            let key = InstanceKey::new(station, Frequency::DAILY, measurand, &options.source);
            match db.instance(&key) {
                Ok(_) => {}
                Err(TsdbError::MissingData { .. }) => {
                    db.add_timeseries_instance(&key, "")?;
                }
                Err(e) => return Err(e.into()),
            }

            let path = acorn_file(&options.data_dir, tag, station);
            if !path.is_file() {
                warn!(path = %path.display(), station, measurand, "no data file, skipping");
                summary.files_missing = summary.files_missing.saturating_add(1);
                continue;
            }

            let series = ingest::parse_acorn(&fs::read_to_string(&path)?)?;
            let report = db.write(&key, &series)?;
            info!(
                station,
                measurand,
                created = report.created.len(),
                updated = report.updated.len(),
                "loaded"
            );
            summary.files_loaded = summary.files_loaded.saturating_add(1);
            summary.records_written = summary.records_written.saturating_add(report.created.len());
        }
    }

    info!(
        stations = summary.stations,
        loaded = summary.files_loaded,
        missing = summary.files_missing,
        "load complete"
    );
    Ok(summary)
}

fn ensure_acorn_catalog(db: &Database, source: &str) -> CliResult<()> {
    for (short_id, long_id, description, _) in ACORN_MEASURANDS {
        ignore_duplicate(db.add_measurand(short_id, long_id, description))?;
    }
    ignore_duplicate(db.add_source(source, "Bureau of Meteorology ACORN-SAT"))
}

fn ignore_duplicate(result: tsdb_core::Result<()>) -> CliResult<()> {
    match result {
        Ok(()) | Err(TsdbError::Duplicate { .. }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acorn_file_name() {
        let path = acorn_file(Path::new("/data"), "maxT", "023090");
        assert_eq!(path, PathBuf::from("/data/acorn.sat.maxT.023090.daily.txt"));
    }

    #[test]
    fn station_list_splits_on_whitespace() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("stations.txt");
        fs::write(&path, "023090 066062\n\n009021\n").expect("write");

        let stations = read_station_list(&path).expect("read");
        assert_eq!(stations, vec!["023090", "066062", "009021"]);
    }

    #[test]
    fn duplicates_are_not_errors_for_the_loader() {
        let duplicate = Err(TsdbError::Duplicate {
            kind: "source",
            key: ACORN_SOURCE.to_string(),
        });
        assert!(ignore_duplicate(duplicate).is_ok());
        assert!(ignore_duplicate(Err(TsdbError::InvalidFrequency("Q".into()))).is_err());
    }
}
