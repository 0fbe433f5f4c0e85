//! Integration tests for the create and load commands.
//!
//! Uses tempfile for testing file-based operations.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::NaiveDate;
use std::path::PathBuf;
use tempfile::TempDir;
use tsdb::cli::{CliError, LoadOptions, acorn_file, cmd_create, cmd_load};
use tsdb_core::series::midnight;
use tsdb_core::{Database, Frequency, InstanceFilter, InstanceKey, TsdbError};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write an ACORN-SAT daily file for `station`.
fn write_acorn(dir: &TempDir, tag: &str, station: &str, rows: &[(&str, &str)]) -> PathBuf {
    let path = acorn_file(dir.path(), tag, station);
    let mut text = String::from("  20140101  20140103 missing_value=99999.9 header\n");
    for (date, value) in rows {
        text.push_str(&format!("{date} {value}\n"));
    }
    std::fs::write(&path, text).unwrap();
    path
}

fn options(dir: &TempDir) -> LoadOptions {
    LoadOptions {
        data_dir: dir.path().to_path_buf(),
        ..LoadOptions::default()
    }
}

// =============================================================================
// CREATE COMMAND TESTS
// =============================================================================

#[test]
fn test_create_makes_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("hydro_db");

    cmd_create(&db_path).unwrap();
    assert!(Database::open(&db_path).is_ok());
}

#[test]
fn test_create_fails_if_exists() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("hydro_db");
    cmd_create(&db_path).unwrap();

    let result = cmd_create(&db_path);
    assert!(matches!(result, Err(CliError::Db(TsdbError::AlreadyExists(_)))));
}

// =============================================================================
// LOAD COMMAND TESTS
// =============================================================================

#[test]
fn test_load_registers_and_writes_station() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("acorn_db");
    cmd_create(&db_path).unwrap();

    write_acorn(&temp, "maxT", "023090", &[("20140101", "30.1"), ("20140102", "99999.9"), ("20140103", "28.0")]);
    write_acorn(&temp, "minT", "023090", &[("20140101", "15.2")]);

    let summary = cmd_load(&db_path, &["023090".to_string()], &options(&temp)).unwrap();
    assert_eq!(summary.stations, 1);
    assert_eq!(summary.files_loaded, 2);
    assert_eq!(summary.files_missing, 0);

    let db = Database::open(&db_path).unwrap();
    assert_eq!(db.ts_list(&InstanceFilter::default()).unwrap(), vec!["023090"]);
    let key = InstanceKey::new("023090", Frequency::DAILY, "maxT", "BOM_ACORN_SAT");
    let series = db.read(&key).unwrap();
    assert_eq!(series.values().collect::<Vec<_>>(), vec![Some(30.1), None, Some(28.0)]);
    let first = midnight(NaiveDate::from_ymd_opt(2014, 1, 1).unwrap());
    assert_eq!(series.first(), Some((first, Some(30.1))));
}

#[test]
fn test_load_missing_file_is_a_warning() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("acorn_db");
    cmd_create(&db_path).unwrap();
    write_acorn(&temp, "maxT", "066062", &[("20140101", "22.0")]);

    let summary = cmd_load(&db_path, &["066062".to_string()], &options(&temp)).unwrap();
    assert_eq!(summary.files_loaded, 1);
    assert_eq!(summary.files_missing, 1);
}

#[test]
fn test_load_twice_is_idempotent() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("acorn_db");
    cmd_create(&db_path).unwrap();
    write_acorn(&temp, "maxT", "023090", &[("20140101", "30.1"), ("20140102", "31.0")]);

    let stations = vec!["023090".to_string(), "023090".to_string()];
    let first = cmd_load(&db_path, &stations, &options(&temp)).unwrap();
    assert_eq!(first.stations, 1);
    assert_eq!(first.records_written, 2);

    let second = cmd_load(&db_path, &stations, &options(&temp)).unwrap();
    assert_eq!(second.records_written, 0);
}

#[test]
fn test_load_into_missing_database() {
    let temp = create_temp_dir();
    let result = cmd_load(&temp.path().join("nope"), &["023090".to_string()], &options(&temp));
    assert!(matches!(result, Err(CliError::Db(TsdbError::NotFound(_)))));
}
