//! Integration tests for console commands.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use tempfile::TempDir;
use tsdb::cli::CliError;
use tsdb::console::{Console, Outcome};
use tsdb_core::{Database, TsdbError};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn run(console: &Console, line: &str) -> String {
    match console.execute(line).unwrap() {
        Outcome::Continue(text) => text,
        Outcome::Quit => panic!("unexpected quit for '{line}'"),
    }
}

/// Console over a database holding the 410730 daily streamflow series.
fn create_console() -> (TempDir, Console) {
    let temp = tempfile::tempdir().unwrap();
    let db = Database::create(temp.path().join("test_tsdb")).unwrap();
    let console = Console::new(db);

    run(&console, "add-measurand Q STREAMFLOW Streamflow");
    run(&console, "add-source DATA_SOURCE");
    run(&console, "add-timeseries 410730");
    run(&console, "add-instance 410730 D Q DATA_SOURCE");

    let csv = temp.path().join("in.csv");
    std::fs::write(&csv, "date,value\n2014-01-01,1\n2014-01-02,2\n2014-01-03,3\n").unwrap();
    let out = run(&console, &format!("write 410730 D Q DATA_SOURCE {}", csv.display()));
    assert_eq!(out, "created 3 records, updated 0 records");

    (temp, console)
}

// =============================================================================
// TESTS
// =============================================================================

#[test]
fn test_banner_shows_database_path() {
    let (temp, console) = create_console();
    let banner = console.banner();
    assert!(banner.starts_with("Running timeseries database: "));
    assert!(banner.contains(&temp.path().join("test_tsdb").display().to_string()));
}

#[test]
fn test_read_prints_csv() {
    let (_temp, console) = create_console();
    let out = run(&console, "read 410730 D Q DATA_SOURCE");
    assert_eq!(
        out,
        "time,value\n2014-01-01T00:00:00Z,1\n2014-01-02T00:00:00Z,2\n2014-01-03T00:00:00Z,3"
    );
}

#[test]
fn test_read_as_at_before_any_write_is_empty() {
    let (_temp, console) = create_console();
    let out = run(&console, "read 410730 D Q DATA_SOURCE 2000-01-01");
    assert_eq!(out, "time,value");
}

#[test]
fn test_listing_commands() {
    let (_temp, console) = create_console();
    assert_eq!(run(&console, "list"), "410730");
    assert_eq!(run(&console, "list measurand=Q freq=D"), "410730");
    assert_eq!(run(&console, "list source=OTHER"), "");
    assert_eq!(run(&console, "measurands"), "Q\tSTREAMFLOW\tStreamflow");
    assert!(run(&console, "instances 410730").starts_with("410730/Q/DATA_SOURCE/D\t"));
}

#[test]
fn test_export_writes_file() {
    let (temp, console) = create_console();
    let out_path = temp.path().join("out.csv");
    let out = run(&console, &format!("export 410730 D Q DATA_SOURCE {}", out_path.display()));
    assert!(out.starts_with("exported 3 records"));
    let text = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn test_path_command() {
    let (_temp, console) = create_console();
    assert!(run(&console, "path 410730 D Q DATA_SOURCE").ends_with(".tsdb"));
    assert!(run(&console, "path 410730 D Q DATA_SOURCE log").ends_with(".log"));
}

#[test]
fn test_errors_do_not_end_the_session() {
    let (_temp, console) = create_console();
    assert!(matches!(console.execute("frobnicate"), Err(CliError::Usage(_))));
    assert!(matches!(
        console.execute("add-timeseries 410730"),
        Err(CliError::Db(TsdbError::Duplicate { .. }))
    ));
    assert!(matches!(
        console.execute("read 410730 2MS Q DATA_SOURCE"),
        Err(CliError::Db(TsdbError::InvalidFrequency(_)))
    ));
    // still usable afterwards
    assert_eq!(run(&console, "list"), "410730");
}

#[test]
fn test_quit_and_exit() {
    let (_temp, console) = create_console();
    assert_eq!(console.execute("quit").unwrap(), Outcome::Quit);
    assert_eq!(console.execute("exit").unwrap(), Outcome::Quit);
}

#[test]
fn test_stats_after_reads() {
    let (_temp, console) = create_console();
    run(&console, "read 410730 D Q DATA_SOURCE");
    run(&console, "read 410730 D Q DATA_SOURCE");
    assert!(run(&console, "stats").contains("1 hits, 1 misses"));
}

#[test]
fn test_write_json_points_file() {
    let (temp, console) = create_console();
    let json = temp.path().join("update.JSON");
    std::fs::write(
        &json,
        r#"{"points": [
            {"time": "2014-01-03T00:00:00Z", "value": 30.0},
            {"time": "2014-01-04T00:00:00Z", "value": null}
        ]}"#,
    )
    .unwrap();

    let out = run(&console, &format!("write 410730 D Q DATA_SOURCE {}", json.display()));
    assert_eq!(out, "created 2 records, updated 1 records");
    assert_eq!(
        run(&console, "read 410730 D Q DATA_SOURCE"),
        "time,value\n2014-01-01T00:00:00Z,1\n2014-01-02T00:00:00Z,2\n\
         2014-01-03T00:00:00Z,30\n2014-01-04T00:00:00Z,"
    );
}

#[test]
fn test_write_malformed_json_is_an_error() {
    let (temp, console) = create_console();
    let json = temp.path().join("bad.json");
    std::fs::write(&json, "date,value\n2014-01-05,5\n").unwrap();

    let result = console.execute(&format!("write 410730 D Q DATA_SOURCE {}", json.display()));
    assert!(matches!(result, Err(CliError::Json(_))));
}
