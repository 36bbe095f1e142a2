//! CLI module
//!
//! Command-line interface for running paged exports.
//!
//! # Commands
//!
//! - `check` - Test the database connection
//! - `tables` - List tables of the attached database
//! - `validate` - Validate the export definition and query shape
//! - `export` - Page through the query and write CSV

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
