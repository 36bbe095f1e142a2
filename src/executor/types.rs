//! Executor trait

use crate::error::Result;
use crate::types::{Row, SqlValue};

/// Runs a query with positional `?` arguments and returns its rows in order
///
/// Implementations own retry and timeout policy; errors are surfaced to the
/// caller unchanged.
pub trait QueryExecutor {
    /// Execute `query` bound to `args`
    fn execute(&self, query: &str, args: &[SqlValue]) -> Result<Vec<Row>>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &E {
    fn execute(&self, query: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
        (**self).execute(query, args)
    }
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for Box<E> {
    fn execute(&self, query: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
        (**self).execute(query, args)
    }
}
