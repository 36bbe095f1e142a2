// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # Paged Query
//!
//! Lazy, page-by-page iteration over SQL queries that were not written with
//! pagination in mind.
//!
//! ## Features
//!
//! - **Bounded fetches**: `LIMIT ? OFFSET ?` is appended to the base query
//! - **Lazy paging**: the next page is fetched only when the current one is used up
//! - **No count query**: a short page marks the end of the results
//! - **DuckDB access**: PostgreSQL, MySQL, SQLite and DuckDB files via DuckDB extensions
//! - **CSV export**: stream any sequence into a delimited file
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use paged_query::convert::DeserializeConverter;
//! use paged_query::executor::DuckDbExecutor;
//! use paged_query::PagedQuery;
//!
//! #[derive(serde::Deserialize)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! let executor = DuckDbExecutor::open_in_memory()?;
//! let users = PagedQuery::new(
//!     1000,
//!     &executor,
//!     "SELECT id, name FROM users WHERE active = ? ORDER BY id",
//!     DeserializeConverter::<User>::new(),
//!     [true],
//! )?;
//!
//! for user in users {
//!     let user = user?;
//!     println!("{} {}", user.id, user.name);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          PagedQuery                             │
//! │  new() → first page    has_next() → fetch on demand    next()   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴───────┬─────────────────────────┐
//! │   Executor   │      Converter        │        Output           │
//! ├──────────────┼───────────────────────┼─────────────────────────┤
//! │ DuckDB       │ Column                │ CSV writer              │
//! │ Postgres     │ JSON object           │ CSV reader              │
//! │ MySQL/SQLite │ serde Deserialize     │                         │
//! └──────────────┴───────────────────────┴─────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Template interpolation
pub mod template;

/// Export definitions loaded from YAML
pub mod config;

/// Row conversion
pub mod convert;

/// Query execution via DuckDB
pub mod executor;

/// Paged query sequence
pub mod pagination;

/// CSV output
pub mod output;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_export, load_export_from_str, ExportDefinition};
pub use convert::RowConverter;
pub use executor::{DuckDbExecutor, QueryExecutor};
pub use pagination::PagedQuery;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
