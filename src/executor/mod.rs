//! Query executor module
//!
//! A query executor runs one query with positional arguments and returns
//! every resulting row. The paging layer treats it as an opaque collaborator.
//!
//! The production executor is DuckDB, which can attach PostgreSQL, MySQL,
//! SQLite and DuckDB files as a read-only `source_db` catalog.

mod engine;
mod types;

pub use engine::DuckDbExecutor;
pub use types::QueryExecutor;
