//! Streaming CSV reader for operation logs
//!
//! Provides an iterator over typed operations from a CSV file, delegating
//! format concerns to the `csv_format` module.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as `Err` variants with line numbers
//!   so the caller can log and continue

use crate::io::csv_format::{convert_op_record, OpRecord, Operation};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Streaming operation log reader
///
/// Reads rows one at a time; memory usage does not grow with file size.
#[derive(Debug)]
pub struct OpReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl OpReader {
    /// Open an operation log for streaming iteration
    ///
    /// The CSV reader trims whitespace and tolerates missing trailing
    /// columns.
    ///
    /// # Errors
    ///
    /// Returns an error message if the file cannot be opened.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file {}: {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for OpReader {
    type Item = Result<Operation, String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.line_num += 1;
        let line = self.line_num;

        let result = self.reader.deserialize::<OpRecord>().next()?;
        Some(match result {
            Ok(record) => {
                convert_op_record(record).map_err(|e| format!("line {}: {}", line, e))
            }
            Err(e) => Err(format!("line {}: {}", line, e)),
        })
    }
}
