//! CSV reader
//!
//! Parses delimited text produced by the writer back into string cells.

use crate::error::{Error, Result};

/// Parsed CSV content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    /// First row
    pub headers: Vec<String>,
    /// Remaining rows
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Cell of `row` under `header`
    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let column = self.headers.iter().position(|h| h == header)?;
        self.rows.get(row)?.get(column).map(String::as_str)
    }
}

/// Parse CSV text whose first row is a header
///
/// Quoted cells may contain the delimiter, doubled quotes and line breaks.
/// Every row must have as many cells as the header.
pub fn read_csv(body: &str, delimiter: char) -> Result<CsvTable> {
    let mut records = parse_records(body, delimiter)?.into_iter();

    let Some(headers) = records.next() else {
        return Ok(CsvTable::default());
    };

    let rows: Vec<Vec<String>> = records.collect();
    for (i, row) in rows.iter().enumerate() {
        if row.len() != headers.len() {
            return Err(Error::csv_parse(format!(
                "row {} has {} cells, expected {}",
                i + 1,
                row.len(),
                headers.len()
            )));
        }
    }

    Ok(CsvTable { headers, rows })
}

/// Split CSV text into records of cells
fn parse_records(body: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                // Check for escaped quote
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut current));
        } else if c == '\n' || c == '\r' {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            fields.push(std::mem::take(&mut current));
            records.push(std::mem::take(&mut fields));
        } else {
            current.push(c);
        }
    }

    if in_quotes {
        return Err(Error::csv_parse("unterminated quoted cell"));
    }

    // Last line without a trailing newline
    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
        records.push(fields);
    }

    Ok(records)
}
