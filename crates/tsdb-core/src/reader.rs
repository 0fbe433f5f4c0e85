//! # Reader Module
//!
//! Loading data files back into memory.

use crate::error::Result;
use crate::formats::decode_records;
use crate::primitives::Record;
use crate::series::TimeSeries;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// All records of a data file. An absent file holds no records.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    match fs::read(path) {
        Ok(bytes) => decode_records(&bytes, path),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

/// A data file as a series; missing records read as `None`.
pub fn read_series(path: &Path) -> Result<TimeSeries> {
    TimeSeries::from_records(&read_records(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::encode_records;

    #[test]
    fn absent_file_reads_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let series = read_series(&dir.path().join("none.tsdb")).expect("absent is empty");
        assert!(series.is_empty());
    }

    #[test]
    fn missing_records_read_as_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("a.tsdb");
        fs::write(
            &path,
            encode_records(&[Record::observed(0, 1.0), Record::missing(86_400)]),
        )
        .expect("write fixture");

        let series = read_series(&path).expect("valid file");
        let values: Vec<_> = series.values().collect();
        assert_eq!(values, vec![Some(1.0), None]);
    }
}
