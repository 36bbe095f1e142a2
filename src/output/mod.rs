//! Output module
//!
//! Serializes record sequences to delimited text.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Writing any `Iterator<Item = Result<T>>` of serializable records as CSV
//!   with a fixed header order (a paged query drains straight into it)
//! - Writing to a chosen file or a fresh temp file
//! - Reading CSV text back for verification

mod reader;
mod writer;

pub use reader::{read_csv, CsvTable};
pub use writer::{
    write_csv, write_csv_file, write_csv_temp_file, CsvExport, CsvWriter, CsvWriterConfig,
};
