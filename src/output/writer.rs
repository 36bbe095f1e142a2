//! CSV file writer
//!
//! Writes serializable records as delimited text with a fixed header order.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Configuration for CSV writer
#[derive(Debug, Clone)]
pub struct CsvWriterConfig {
    delimiter: char,
    write_header: bool,
}

impl Default for CsvWriterConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            write_header: true,
        }
    }
}

impl CsvWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set field delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Enable or disable the header row
    #[must_use]
    pub fn with_header(mut self, enabled: bool) -> Self {
        self.write_header = enabled;
        self
    }

    /// Get field delimiter
    #[must_use]
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Get header row enabled
    #[must_use]
    pub fn is_header_enabled(&self) -> bool {
        self.write_header
    }
}

/// Summary of a finished CSV export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    /// File that was written
    pub path: PathBuf,
    /// Number of data records (excluding the header)
    pub record_count: usize,
}

/// Streaming CSV writer
///
/// Each record is serialized to a JSON object and its fields are emitted in
/// header order. Missing fields and nulls become empty cells.
pub struct CsvWriter<W: Write> {
    writer: W,
    headers: Vec<String>,
    config: CsvWriterConfig,
    header_written: bool,
    record_count: usize,
}

impl<W: Write> CsvWriter<W> {
    /// Create a new writer
    pub fn new(writer: W, headers: Vec<String>, config: CsvWriterConfig) -> Result<Self> {
        if headers.is_empty() {
            return Err(Error::output("CSV output needs at least one header"));
        }

        Ok(Self {
            writer,
            headers,
            config,
            header_written: false,
            record_count: 0,
        })
    }

    /// Column order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Records written so far
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Write a serializable record
    pub fn write_record<S: Serialize>(&mut self, record: &S) -> Result<()> {
        match serde_json::to_value(record)? {
            JsonValue::Object(object) => self.write_object(&object),
            other => Err(Error::output(format!(
                "CSV records must serialize to an object, got {other}"
            ))),
        }
    }

    /// Write a JSON object record
    pub fn write_object(&mut self, object: &JsonObject) -> Result<()> {
        self.ensure_header()?;

        let cells: Vec<String> = self
            .headers
            .iter()
            .map(|header| object.get(header).map(cell_text).unwrap_or_default())
            .collect();
        self.write_line(&cells)?;

        self.record_count += 1;
        Ok(())
    }

    /// Write one record given as cells in header order
    ///
    /// Unlike [`write_object`](Self::write_object) this does not look cells up
    /// by name, so repeated header names keep every value.
    pub fn write_values(&mut self, values: &[JsonValue]) -> Result<()> {
        if values.len() != self.headers.len() {
            return Err(Error::output(format!(
                "record has {} cells, expected {}",
                values.len(),
                self.headers.len()
            )));
        }

        self.ensure_header()?;
        let cells: Vec<String> = values.iter().map(cell_text).collect();
        self.write_line(&cells)?;

        self.record_count += 1;
        Ok(())
    }

    /// Flush and return the number of records written
    ///
    /// The header row is still emitted when no records were written.
    pub fn finish(mut self) -> Result<usize> {
        self.ensure_header()?;
        self.writer.flush()?;
        Ok(self.record_count)
    }

    fn ensure_header(&mut self) -> Result<()> {
        if self.config.write_header && !self.header_written {
            let headers = self.headers.clone();
            self.write_line(&headers)?;
        }
        self.header_written = true;
        Ok(())
    }

    fn write_line(&mut self, cells: &[String]) -> Result<()> {
        let delimiter = self.config.delimiter;
        let line = cells
            .iter()
            .map(|cell| escape_cell(cell, delimiter))
            .collect::<Vec<_>>()
            .join(&delimiter.to_string());
        writeln!(self.writer, "{line}")?;
        Ok(())
    }
}

/// Text of a single cell
fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        // Nested values are written as JSON text
        _ => value.to_string(),
    }
}

/// Quote a cell if it contains the delimiter, a quote or a line break
fn escape_cell(cell: &str, delimiter: char) -> String {
    if cell.contains(delimiter) || cell.contains(['"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Drain records into a CSV writer and return the record count
///
/// Works with any `Iterator<Item = Result<T>>`, including a paged query.
/// The first error from the records stops the export and is returned.
pub fn write_csv<T, I, W>(
    records: I,
    writer: W,
    headers: Vec<String>,
    config: CsvWriterConfig,
) -> Result<usize>
where
    T: Serialize,
    I: IntoIterator<Item = Result<T>>,
    W: Write,
{
    let mut csv = CsvWriter::new(writer, headers, config)?;
    for record in records {
        csv.write_record(&record?)?;
    }
    csv.finish()
}

/// Write records to a CSV file
pub fn write_csv_file<T, I>(
    records: I,
    path: impl AsRef<Path>,
    headers: Vec<String>,
    config: CsvWriterConfig,
) -> Result<CsvExport>
where
    T: Serialize,
    I: IntoIterator<Item = Result<T>>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let record_count = write_csv(records, BufWriter::new(file), headers, config)?;

    tracing::debug!(path = %path.display(), records = record_count, "Wrote CSV file");

    Ok(CsvExport {
        path: path.to_path_buf(),
        record_count,
    })
}

/// Write records to a new file in the system temp directory
///
/// The file name starts with `file_prefix` and ends with `.csv`; the caller
/// owns the file afterwards.
pub fn write_csv_temp_file<T, I>(
    records: I,
    file_prefix: &str,
    headers: Vec<String>,
) -> Result<CsvExport>
where
    T: Serialize,
    I: IntoIterator<Item = Result<T>>,
{
    let path = std::env::temp_dir().join(format!("{file_prefix}_{}.csv", unique_suffix()));
    write_csv_file(records, path, headers, CsvWriterConfig::default())
}

/// Generate a simple unique suffix (timestamp + process id)
fn unique_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{timestamp:x}_{}", std::process::id())
}
