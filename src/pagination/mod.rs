//! Pagination module
//!
//! Turns a query that was not written with pagination in mind into a lazy,
//! forward-only sequence of bounded `LIMIT ? OFFSET ?` fetches.
//!
//! # Overview
//!
//! [`PagedQuery`] appends the limit/offset clause to the base query once,
//! fetches the first page eagerly, and fetches every later page only when the
//! current one is exhausted. A page shorter than the page size marks the end,
//! so no count query is needed. When the row count is an exact multiple of
//! the page size, one extra (empty) fetch observes the end.

mod sequence;
mod types;

pub use sequence::PagedQuery;
pub(crate) use types::validate;
pub use types::{inspect_query, PageWindow, QueryShape, LIMIT_OFFSET, NO_ARGS};

#[cfg(test)]
mod tests;
