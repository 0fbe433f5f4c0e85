//! `tsdb-load <db> <station_ids...>`: load ACORN-SAT daily temperature files.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tsdb::cli::{ACORN_SOURCE, CliResult, LoadOptions, cmd_load, init_tracing, read_station_list};

#[derive(Debug, Parser)]
#[command(name = "tsdb-load", version, about = "Load ACORN-SAT station data into a TSDB database")]
struct Args {
    /// Database to load into.
    db: PathBuf,

    /// Station identifiers.
    stations: Vec<String>,

    /// Directory holding the downloaded acorn.sat.*.daily.txt files.
    #[arg(long, env = "TSDB_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Whitespace-separated list of further station identifiers.
    #[arg(long)]
    stations_file: Option<PathBuf>,

    /// Source id to register the series under.
    #[arg(long, default_value = ACORN_SOURCE)]
    source: String,
}

fn run(args: Args) -> CliResult<()> {
    let mut stations = args.stations;
    if let Some(path) = &args.stations_file {
        stations.extend(read_station_list(path)?);
    }

    let options = LoadOptions {
        data_dir: args.data_dir,
        source: args.source,
    };
    let summary = cmd_load(&args.db, &stations, &options)?;
    println!(
        "loaded {} files for {} stations ({} missing, {} records)",
        summary.files_loaded, summary.stations, summary.files_missing, summary.records_written
    );
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
