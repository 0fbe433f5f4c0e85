//! # Formats Module
//!
//! Binary layouts of the per-instance files.
//!
//! This module contains:
//! - Data file records (20 bytes: time, value, meta)
//! - Change log header and entries (28 bytes: record + replacement time)
//!
//! Note: File I/O stays in `writer` and `changelog`.
//! This module only handles byte conversion (pure transformations).

mod data_file;
mod log_file;

pub use data_file::*;
pub use log_file::*;
