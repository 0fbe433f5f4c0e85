//! `tsdb-server <db> [--bind ADDR]`: HTTP API for a database.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tsdb::api;
use tsdb::cli::init_tracing;
use tsdb_core::Database;

#[derive(Debug, Parser)]
#[command(name = "tsdb-server", version, about = "Serve a TSDB database over HTTP")]
struct Args {
    /// Database to serve.
    db: PathBuf,

    /// Address to listen on.
    #[arg(long, env = "TSDB_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let db = match Database::open(&args.db) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match api::serve(db, args.bind).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
