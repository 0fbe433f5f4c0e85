//! `tsdb-create <name>`: create a new, empty database.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tsdb::cli::{cmd_create, init_tracing};

#[derive(Debug, Parser)]
#[command(name = "tsdb-create", version, about = "Create a new TSDB database")]
struct Args {
    /// Path of the database directory to create.
    name: PathBuf,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match cmd_create(&args.name) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
