//! I/O module
//!
//! Handles CSV parsing and output for the replay surface.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (operation conversion, balance output)
//! - `reader` - Streaming operation log reader

pub mod csv_format;
pub mod reader;

pub use csv_format::{convert_op_record, write_balances_csv, OpRecord, Operation};
pub use reader::OpReader;
