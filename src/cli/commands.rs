//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Paged query export CLI
#[derive(Parser, Debug)]
#[command(name = "paged-query")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Export definition file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Template variable available as `{{ vars.KEY }}` (repeatable)
    #[arg(long = "var", global = true, value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,

    /// Output format for status messages
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test connection to the database
    Check,

    /// List tables in the attached database
    Tables,

    /// Validate the export definition without connecting
    Validate,

    /// Page through the query and write CSV
    Export {
        /// Rows per page (overrides query.page_size)
        #[arg(long)]
        page_size: Option<u64>,

        /// Output file (overrides output.path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse a `KEY=VALUE` pair
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
