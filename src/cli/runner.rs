//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_export, ExportDefinition};
use crate::convert::RowConverter;
use crate::error::{Error, Result, ResultExt};
use crate::executor::{DuckDbExecutor, QueryExecutor};
use crate::output::{CsvWriter, CsvWriterConfig};
use crate::pagination::{self, inspect_query, PagedQuery, LIMIT_OFFSET};
use crate::template::TemplateContext;
use crate::types::{Row, SqlValue};
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check(),
            Commands::Tables => self.tables(),
            Commands::Validate => self.validate(),
            Commands::Export { page_size, output } => {
                self.export(*page_size, output.as_deref()).map(|_| ())
            }
        }
    }

    /// Load the export definition
    fn load_definition(&self) -> Result<ExportDefinition> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Export definition not specified (use -c flag)"))?;
        load_export(path)
    }

    /// Build the template context from `--var` flags
    fn template_context(&self) -> TemplateContext {
        let mut context = TemplateContext::new();
        for (key, value) in &self.cli.vars {
            context.set_var(key, value);
        }
        context
    }

    /// Connect to the database of a definition
    fn connect(&self, def: &ExportDefinition) -> Result<DuckDbExecutor> {
        let executor = DuckDbExecutor::new(&def.connection, &self.template_context())?;
        tracing::info!(
            engine = %executor.db_type(),
            target = %executor.connection_info(),
            "Connected"
        );
        Ok(executor)
    }

    /// Check connection
    fn check(&self) -> Result<()> {
        let def = self.load_definition()?;

        let status = self
            .connect(&def)
            .and_then(|executor| executor.check_connection());

        match status {
            Ok(()) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "SUCCEEDED"
                    }
                }));
                Ok(())
            }
            Err(e) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "FAILED",
                        "message": e.to_string()
                    }
                }));
                Err(e)
            }
        }
    }

    /// List tables
    fn tables(&self) -> Result<()> {
        let def = self.load_definition()?;
        let executor = self.connect(&def)?;
        let tables = executor.list_tables()?;

        self.output_message(&json!({
            "type": "TABLES",
            "tables": tables
        }));
        Ok(())
    }

    /// Validate the definition and the query shape
    fn validate(&self) -> Result<()> {
        let def = self.load_definition()?;
        pagination::validate(def.query.page_size, &def.query.sql, def.query.args.len())?;

        let shape = inspect_query(&def.query.sql);
        self.output_message(&json!({
            "type": "VALIDATION",
            "status": "VALID",
            "name": def.name,
            "pagedQuery": format!("{}{LIMIT_OFFSET}", def.query.sql),
            "placeholders": shape.placeholders,
            "pageSize": def.query.page_size
        }));
        Ok(())
    }

    /// Export the query to CSV, returning where it was written
    fn export(&self, page_size: Option<u64>, output: Option<&Path>) -> Result<PathBuf> {
        let def = self.load_definition()?;
        let executor = self.connect(&def)?;
        let page_size = page_size.unwrap_or(def.query.page_size);
        let delimiter = def.output.delimiter_char()?;
        let path = output
            .map(Path::to_path_buf)
            .or_else(|| def.output.path.clone())
            .unwrap_or_else(|| default_output_path(&def.name));

        let started = Instant::now();
        let mut rows = PagedQuery::new(
            page_size,
            &executor,
            &def.query.sql,
            |row: &Row| -> Result<Row> { Ok(row.clone()) },
            def.query.args.clone(),
        )?;

        let config = CsvWriterConfig::new()
            .with_delimiter(delimiter)
            .with_header(def.output.write_header);
        let record_count = write_export(&mut rows, &path, &def.output.headers, config)?;

        let elapsed = started.elapsed();
        tracing::info!(
            export = %def.name,
            records = record_count,
            pages = rows.pages_fetched(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Export complete"
        );

        self.output_message(&json!({
            "type": "EXPORT",
            "export": {
                "name": def.name,
                "path": path.display().to_string(),
                "recordCount": record_count,
                "pages": rows.pages_fetched(),
                "pageSize": page_size,
                "elapsedMs": elapsed.as_millis() as u64
            }
        }));

        Ok(path)
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Stream every row into `path`
///
/// Rows go to a hidden `.partial` sibling that replaces `path` only once the
/// whole sequence was written; on failure it is removed and `path` is left as
/// it was.
fn write_export<E, C>(
    rows: &mut PagedQuery<Row, E, C>,
    path: &Path,
    headers: &[String],
    config: CsvWriterConfig,
) -> Result<usize>
where
    E: QueryExecutor,
    C: RowConverter<Row>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let partial = partial_path(path);
    let written = File::create(&partial)
        .with_context(|| format!("Failed to create output file '{}'", partial.display()))
        .and_then(|file| write_rows(rows, BufWriter::new(file), headers, config));

    match written {
        Ok(record_count) => {
            fs::rename(&partial, path).with_context(|| {
                format!("Failed to move export into '{}'", path.display())
            })?;
            Ok(record_count)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&partial) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %partial.display(),
                        error = %cleanup,
                        "Failed to remove partial export"
                    );
                }
            }
            Err(e)
        }
    }
}

/// Write the rows as CSV
///
/// Without configured headers the result columns become the header and cells
/// are written by position, so repeated column names keep every value.
/// Configured headers select cells by name and must not name a repeated
/// column.
fn write_rows<E, C, W>(
    rows: &mut PagedQuery<Row, E, C>,
    writer: W,
    headers: &[String],
    config: CsvWriterConfig,
) -> Result<usize>
where
    E: QueryExecutor,
    C: RowConverter<Row>,
    W: Write,
{
    let first = if rows.has_next()? {
        Some(rows.next_value()?)
    } else {
        None
    };

    let by_position = headers.is_empty();
    let headers = match (&first, by_position) {
        (_, false) => headers.to_vec(),
        (Some(row), true) => row.columns().to_vec(),
        (None, true) => {
            tracing::warn!(
                "Query returned no rows and no headers are configured; writing an empty file"
            );
            return Ok(0);
        }
    };

    if let (Some(row), false) = (&first, by_position) {
        reject_ambiguous_headers(row.columns(), &headers)?;
    }

    let mut csv = CsvWriter::new(writer, headers, config)?;
    if let Some(row) = first {
        write_row(&mut csv, &row, by_position)?;
    }
    while rows.has_next()? {
        write_row(&mut csv, &rows.next_value()?, by_position)?;
    }
    csv.finish()
}

fn write_row<W: Write>(csv: &mut CsvWriter<W>, row: &Row, by_position: bool) -> Result<()> {
    if by_position {
        let values: Vec<Value> = row.values().iter().map(SqlValue::to_json).collect();
        csv.write_values(&values)
    } else {
        csv.write_object(&row.to_json())
    }
}

/// Fail when a header names a column that occurs more than once
fn reject_ambiguous_headers(columns: &[String], headers: &[String]) -> Result<()> {
    for header in headers {
        if columns.iter().filter(|c| *c == header).count() > 1 {
            return Err(Error::output(format!(
                "Column '{header}' appears more than once in the result; alias it or drop output.headers"
            )));
        }
    }
    Ok(())
}

/// Sibling path an export is written to before it is complete
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "export".to_string(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.partial"))
}

/// Temp file path for exports without a configured output
fn default_output_path(name: &str) -> PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let safe_name: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    std::env::temp_dir().join(format!("{safe_name}_{timestamp}.csv"))
}
