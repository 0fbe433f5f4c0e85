//! `tsdb [<name>] [--version]`: interactive console for a database.

use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tsdb::cli::init_tracing;
use tsdb::console::Console;
use tsdb_core::Database;

#[derive(Debug, Parser)]
#[command(name = "tsdb", about = "Open a TSDB database", disable_version_flag = true)]
struct Args {
    /// Database to open.
    name: Option<PathBuf>,

    /// Print version and exit.
    #[arg(long)]
    version: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    if args.version {
        println!("TSDB version: {}", tsdb_core::VERSION);
        return ExitCode::SUCCESS;
    }

    let Some(name) = args.name else {
        let _ = Args::command().print_help();
        return ExitCode::SUCCESS;
    };

    let result = Database::open(&name)
        .map_err(tsdb::cli::CliError::from)
        .and_then(|db| Console::new(db).run());
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
