//! # TSDB Tools Library
//!
//! Modules behind the `tsdb`, `tsdb-create`, `tsdb-load` and `tsdb-server`
//! binaries, exposed for testing and integration.

pub mod api;
pub mod cli;
pub mod console;
pub mod ingest;

// Re-export tsdb_core for convenience
pub use tsdb_core;
