//! # Storage Module
//!
//! Metadata catalog of a database, kept in redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions (a registration either lands whole or not at all)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Values are postcard-encoded metadata records.

mod redb_catalog;

pub use redb_catalog::{CATALOG_FILE, Catalog, SCHEMA_VERSION};
