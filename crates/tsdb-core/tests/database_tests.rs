//! Integration tests for the database API.
//!
//! Uses tempfile for every database directory.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use tsdb_core::series::midnight;
use tsdb_core::{
    Database, FileKind, Frequency, InstanceFilter, InstanceKey, TimeSeries, TsdbError,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    midnight(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn series(points: &[(DateTime<Utc>, Option<f64>)]) -> TimeSeries {
    points.iter().copied().collect()
}

fn streamflow_key() -> InstanceKey {
    InstanceKey::new("410730", Frequency::DAILY, "Q", "DATA_SOURCE")
}

/// Database with one daily streamflow series, 2014-01-01..03 = 1, 2, 3.
fn create_test_db() -> (TempDir, Database) {
    let temp = tempfile::tempdir().unwrap();
    let db = Database::create(temp.path().join("test_tsdb")).unwrap();

    db.add_measurand("Q", "STREAMFLOW", "Streamflow").unwrap();
    db.add_source("DATA_SOURCE", "").unwrap();
    db.add_timeseries("410730").unwrap();
    db.add_timeseries_instance(&streamflow_key(), "").unwrap();
    db.write(
        &streamflow_key(),
        &series(&[
            (day(2014, 1, 1), Some(1.0)),
            (day(2014, 1, 2), Some(2.0)),
            (day(2014, 1, 3), Some(3.0)),
        ]),
    )
    .unwrap();

    (temp, db)
}

// =============================================================================
// CREATE / OPEN
// =============================================================================

#[test]
fn test_create_fails_if_exists() {
    let (temp, _db) = create_test_db();
    let result = Database::create(temp.path().join("test_tsdb"));
    assert!(matches!(result, Err(TsdbError::AlreadyExists(_))));
}

#[test]
fn test_open_missing_database() {
    let temp = tempfile::tempdir().unwrap();
    let result = Database::open(temp.path().join("nope"));
    assert!(matches!(result, Err(TsdbError::NotFound(_))));
}

#[test]
fn test_reopen_sees_registrations_and_data() {
    let (temp, db) = create_test_db();
    drop(db);

    let db = Database::open(temp.path().join("test_tsdb")).unwrap();
    assert_eq!(db.ts_list(&InstanceFilter::default()).unwrap(), vec!["410730"]);
    let read = db.read(&streamflow_key()).unwrap();
    assert_eq!(read.values().collect::<Vec<_>>(), vec![Some(1.0), Some(2.0), Some(3.0)]);
}

// =============================================================================
// REGISTRATION
// =============================================================================

#[test]
fn test_duplicate_timeseries() {
    let (_temp, db) = create_test_db();
    let result = db.add_timeseries("410730");
    assert!(matches!(result, Err(TsdbError::Duplicate { .. })));
}

#[test]
fn test_instance_with_unknown_measurand() {
    let (_temp, db) = create_test_db();
    let key = InstanceKey::new("410730", Frequency::DAILY, "P", "DATA_SOURCE");
    let result = db.add_timeseries_instance(&key, "");
    assert!(matches!(result, Err(TsdbError::MissingData { kind: "measurand", .. })));
}

#[test]
fn test_write_to_unregistered_instance() {
    let (_temp, db) = create_test_db();
    let key = InstanceKey::new("410730", Frequency::Irregular, "Q", "DATA_SOURCE");
    let result = db.write(&key, &series(&[(day(2014, 1, 1), Some(1.0))]));
    assert!(matches!(result, Err(TsdbError::MissingData { .. })));
}

// =============================================================================
// READ / WRITE
// =============================================================================

#[test]
fn test_update_reports_changed_value() {
    let (_temp, db) = create_test_db();
    let report = db
        .write(&streamflow_key(), &series(&[(day(2014, 1, 2), Some(2.5))]))
        .unwrap();

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].value, 2.0);
    assert_eq!(report.created[0].value, 2.5);

    let read = db.read(&streamflow_key()).unwrap();
    assert_eq!(read.get(&day(2014, 1, 2)), Some(Some(2.5)));
}

#[test]
fn test_read_after_write_is_not_stale() {
    let (_temp, db) = create_test_db();
    let before = db.read(&streamflow_key()).unwrap();
    assert_eq!(before.len(), 3);

    db.write(&streamflow_key(), &series(&[(day(2014, 1, 5), Some(5.0))]))
        .unwrap();

    let after = db.read(&streamflow_key()).unwrap();
    assert_eq!(
        after.values().collect::<Vec<_>>(),
        vec![Some(1.0), Some(2.0), Some(3.0), None, Some(5.0)]
    );
}

#[test]
fn test_repeated_reads_hit_cache() {
    let (_temp, db) = create_test_db();
    db.read(&streamflow_key()).unwrap();
    db.read(&streamflow_key()).unwrap();

    let stats = db.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[test]
fn test_identical_write_adds_no_log_entries() {
    let (_temp, db) = create_test_db();
    let log_path = db.get_file_path(&streamflow_key(), FileKind::Log).unwrap();
    let before = std::fs::metadata(&log_path).unwrap().len();

    let report = db
        .write(
            &streamflow_key(),
            &series(&[(day(2014, 1, 1), Some(1.0)), (day(2014, 1, 2), Some(2.0))]),
        )
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(std::fs::metadata(&log_path).unwrap().len(), before);
}

// =============================================================================
// CHANGE LOG
// =============================================================================

#[test]
fn test_read_log_as_at_earlier_write() {
    let temp = tempfile::tempdir().unwrap();
    let db = Database::create(temp.path().join("db")).unwrap();
    db.add_measurand("Q", "STREAMFLOW", "Streamflow").unwrap();
    db.add_source("DATA_SOURCE", "").unwrap();
    db.add_timeseries("410730").unwrap();
    db.add_timeseries_instance(&streamflow_key(), "").unwrap();

    let first_write = day(2015, 6, 1);
    let second_write = first_write + TimeDelta::days(30);

    db.write_at(
        &streamflow_key(),
        &series(&[(day(2014, 1, 1), Some(1.0)), (day(2014, 1, 2), Some(2.0))]),
        first_write,
    )
    .unwrap();
    db.write_at(
        &streamflow_key(),
        &series(&[(day(2014, 1, 2), Some(20.0)), (day(2014, 1, 3), Some(30.0))]),
        second_write,
    )
    .unwrap();

    let original = db
        .read_log(&streamflow_key(), first_write + TimeDelta::days(1))
        .unwrap();
    assert_eq!(original.values().collect::<Vec<_>>(), vec![Some(1.0), Some(2.0)]);

    let latest = db.read_log(&streamflow_key(), second_write).unwrap();
    assert_eq!(latest, db.read(&streamflow_key()).unwrap());

    let before_anything = db
        .read_log(&streamflow_key(), first_write - TimeDelta::seconds(1))
        .unwrap();
    assert!(before_anything.is_empty());
}

// =============================================================================
// LISTING
// =============================================================================

#[test]
fn test_ts_list_filters() {
    let (_temp, db) = create_test_db();
    db.add_measurand("P", "PRECIPITATION", "Precipitation").unwrap();
    db.add_timeseries("410731").unwrap();
    db.add_timeseries("410732").unwrap();
    db.add_timeseries_instance(
        &InstanceKey::new("410731", Frequency::DAILY, "P", "DATA_SOURCE"),
        "",
    )
    .unwrap();

    assert_eq!(
        db.ts_list(&InstanceFilter::default()).unwrap(),
        vec!["410730", "410731", "410732"]
    );
    assert_eq!(
        db.ts_list(&InstanceFilter::default().measurand("Q")).unwrap(),
        vec!["410730"]
    );
    assert_eq!(
        db.ts_list(&InstanceFilter::default().source("DATA_SOURCE"))
            .unwrap(),
        vec!["410730", "410731"]
    );
    assert!(db
        .ts_list(&InstanceFilter::default().freq(Frequency::Irregular))
        .unwrap()
        .is_empty());
}

#[test]
fn test_list_measurands_and_sources() {
    let (_temp, db) = create_test_db();
    let measurands = db.list_measurands().unwrap();
    assert_eq!(measurands.len(), 1);
    assert_eq!(measurands[0].long_id, "STREAMFLOW");

    let sources = db.list_sources().unwrap();
    assert_eq!(sources[0].short_id, "DATA_SOURCE");
}

#[test]
fn test_read_all_with_excludes() {
    let (_temp, db) = create_test_db();
    db.add_timeseries("410731").unwrap();
    let other = InstanceKey::new("410731", Frequency::DAILY, "Q", "DATA_SOURCE");
    db.add_timeseries_instance(&other, "").unwrap();
    db.write(&other, &series(&[(day(2014, 1, 1), Some(9.0))]))
        .unwrap();

    let all = db
        .read_all(Frequency::DAILY, &InstanceFilter::default().measurand("Q"), &[])
        .unwrap();
    assert_eq!(all.len(), 2);

    let some = db
        .read_all(Frequency::DAILY, &InstanceFilter::default(), &["410730"])
        .unwrap();
    assert_eq!(some.keys().cloned().collect::<Vec<_>>(), vec![other]);
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_parallel_writers_do_not_interleave() {
    let (_temp, db) = create_test_db();
    let db = Arc::new(db);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for i in 0..10i64 {
                    let t = day(2014, 2, 1) + TimeDelta::days(worker * 10 + i);
                    db.write(&streamflow_key(), &series(&[(t, Some(1.0))]))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let read = db.read(&streamflow_key()).unwrap();
    let first = read.first().map(|(t, _)| t);
    let last = read.last().map(|(t, _)| t);
    assert_eq!(first, Some(day(2014, 1, 1)));
    assert_eq!(last, Some(day(2014, 2, 1) + TimeDelta::days(39)));
    // contiguous daily grid: every day from Jan 1 to Mar 12 present once
    assert_eq!(read.len(), 31 + 40);
    assert_eq!(read.observed_count(), 3 + 40);
}

#[test]
fn test_read_racing_a_write_never_caches_old_data() {
    let (_temp, db) = create_test_db();
    let key = InstanceKey::new("410730", Frequency::Irregular, "Q", "DATA_SOURCE");
    db.add_timeseries_instance(&key, "").unwrap();

    let start = day(2000, 1, 1);
    let bulk: TimeSeries = (0..200_000i64)
        .map(|i| (start + TimeDelta::seconds(i * 60), Some(1.0)))
        .collect();
    db.write(&key, &bulk).unwrap();
    let new_point = start + TimeDelta::days(365);

    let db = Arc::new(db);
    for round in 0..5u32 {
        let reader = {
            let db = Arc::clone(&db);
            let key = key.clone();
            thread::spawn(move || db.read(&key).unwrap())
        };
        thread::sleep(std::time::Duration::from_millis(5));
        let t = new_point + TimeDelta::minutes(i64::from(round));
        db.write(&key, &series(&[(t, Some(2.0))])).unwrap();
        reader.join().unwrap();

        let read = db.read(&key).unwrap();
        assert_eq!(read.get(&t), Some(Some(2.0)), "round {round}");
        assert_eq!(read.len(), 200_000 + round as usize + 1);
    }
}

#[test]
fn test_subsecond_points_store_strictly_ascending_seconds() {
    let (_temp, db) = create_test_db();
    let key = InstanceKey::new("410730", Frequency::Irregular, "Q", "DATA_SOURCE");
    db.add_timeseries_instance(&key, "").unwrap();

    let t0 = DateTime::from_timestamp(1_400_000_000, 200_000_000).unwrap();
    let report = db
        .write(
            &key,
            &series(&[(t0, Some(1.0)), (t0 + TimeDelta::milliseconds(500), Some(2.0))]),
        )
        .unwrap();
    assert_eq!(report.created.len(), 1);

    let read = db.read(&key).unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read.first(), DateTime::from_timestamp(1_400_000_000, 0).map(|t| (t, Some(2.0))));
}

#[test]
fn test_misaligned_prepend_leaves_data_untouched() {
    let (_temp, db) = create_test_db();
    let before = day(2013, 12, 30) + TimeDelta::hours(6);
    let result = db.write(&streamflow_key(), &series(&[(before, Some(9.0))]));

    assert!(matches!(result, Err(TsdbError::Data(tsdb_core::DataError::Misaligned { .. }))));
    let read = db.read(&streamflow_key()).unwrap();
    assert_eq!(read.values().collect::<Vec<_>>(), vec![Some(1.0), Some(2.0), Some(3.0)]);
}
