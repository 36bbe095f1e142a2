//! Paged query sequence

use super::types::{validate, PageWindow, LIMIT_OFFSET};
use crate::convert::RowConverter;
use crate::error::{Error, Result};
use crate::executor::QueryExecutor;
use crate::types::SqlValue;
use std::fmt;

/// Lazy, forward-only sequence over every row of a query, fetched page by page
///
/// The first page is fetched by [`PagedQuery::new`]. Later pages are fetched by
/// [`PagedQuery::has_next`] once the buffered page is used up, and never after a
/// page shorter than the page size has been seen. Rows are converted eagerly
/// when their page arrives.
///
/// The sequence only reads: there is no way to remove or modify rows through it.
///
/// ```rust,ignore
/// use paged_query::convert::column;
/// use paged_query::pagination::PagedQuery;
///
/// let mut ids = PagedQuery::new(
///     500,
///     &executor,
///     "SELECT id FROM users WHERE team = ? ORDER BY id",
///     column::<i64>(0),
///     ["core"],
/// )?;
/// while ids.has_next()? {
///     let id = ids.next_value()?;
/// }
/// ```
pub struct PagedQuery<T, E, C> {
    executor: E,
    converter: C,
    /// Base query with the limit/offset clause appended
    query: String,
    /// Caller arguments, never modified
    base_args: Vec<SqlValue>,
    /// Window of the most recent successful fetch
    window: PageWindow,
    is_last_page: bool,
    page: std::vec::IntoIter<T>,
    pages_fetched: u64,
    /// Set once the `Iterator` impl has yielded an error, cleared by the next
    /// successful fetch
    failed: bool,
}

impl<T, E, C> PagedQuery<T, E, C>
where
    E: QueryExecutor,
    C: RowConverter<T>,
{
    /// Create the sequence and fetch its first page
    ///
    /// `base_query` must use `?` placeholders, one per argument, and must not
    /// contain `LIMIT`/`OFFSET` or a trailing `;`. Violations fail before any
    /// query runs. Executor and converter errors from the first fetch are
    /// returned as-is.
    pub fn new<A>(
        page_size: u64,
        executor: E,
        base_query: &str,
        converter: C,
        args: A,
    ) -> Result<Self>
    where
        A: IntoIterator,
        A::Item: Into<SqlValue>,
    {
        let base_args: Vec<SqlValue> = args.into_iter().map(Into::into).collect();
        validate(page_size, base_query, base_args.len())?;

        let window = PageWindow::first(page_size);
        let mut sequence = Self {
            executor,
            converter,
            query: format!("{base_query}{LIMIT_OFFSET}"),
            base_args,
            window,
            is_last_page: false,
            page: Vec::new().into_iter(),
            pages_fetched: 0,
            failed: false,
        };

        sequence.load(window)?;
        Ok(sequence)
    }

    /// Check whether another row is available, fetching the next page if needed
    ///
    /// Once this returns `false` it keeps returning `false` without fetching.
    /// Calling it repeatedly without [`next_value`](Self::next_value) neither
    /// fetches nor skips rows. If a fetch fails the offset is left unchanged.
    pub fn has_next(&mut self) -> Result<bool> {
        loop {
            if !self.page.as_slice().is_empty() {
                return Ok(true);
            }
            if self.is_last_page {
                return Ok(false);
            }
            let window = self.window.next()?;
            self.load(window)?;
        }
    }

    /// Take the next buffered row
    ///
    /// This never fetches; call [`has_next`](Self::has_next) first. With no
    /// buffered row it fails with [`Error::NoSuchElement`].
    pub fn next_value(&mut self) -> Result<T> {
        self.page.next().ok_or_else(|| {
            Error::no_such_element(format!(
                "no buffered row at offset {} (call has_next first)",
                self.window.offset
            ))
        })
    }

    /// Fetch and convert the page at `window`, replacing the current page
    fn load(&mut self, window: PageWindow) -> Result<()> {
        let args = window.bind(&self.base_args);
        tracing::trace!(query = %self.query, "Fetching page");

        let rows = self.executor.execute(&self.query, &args)?;
        let row_count = rows.len() as u64;
        if row_count > window.limit {
            tracing::warn!(
                rows = row_count,
                limit = window.limit,
                "Executor returned more rows than the page limit"
            );
        }

        let page = rows
            .iter()
            .map(|row| self.converter.convert(row))
            .collect::<Result<Vec<T>>>()?;

        self.window = window;
        self.is_last_page = row_count < window.limit;
        self.page = page.into_iter();
        self.pages_fetched += 1;
        self.failed = false;

        tracing::debug!(
            offset = window.offset,
            limit = window.limit,
            rows = row_count,
            last_page = self.is_last_page,
            "Fetched page"
        );

        Ok(())
    }
}

impl<T, E, C> PagedQuery<T, E, C> {
    /// Rows requested per fetch
    pub fn page_size(&self) -> u64 {
        self.window.limit
    }

    /// Offset of the most recently fetched page
    pub fn offset(&self) -> u64 {
        self.window.offset
    }

    /// The rewritten query sent to the executor
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Caller-supplied arguments (without limit and offset)
    pub fn base_args(&self) -> &[SqlValue] {
        &self.base_args
    }

    /// Whether the most recent page was shorter than the page size
    pub fn is_last_page(&self) -> bool {
        self.is_last_page
    }

    /// Number of successful fetches so far
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Rows still buffered from the current page
    pub fn buffered(&self) -> usize {
        self.page.len()
    }
}

/// `next()` is [`has_next`](PagedQuery::has_next) followed by
/// [`next_value`](PagedQuery::next_value). After yielding an error it returns
/// `None` until an explicit `has_next` retry fetches the failed page.
impl<T, E, C> Iterator for PagedQuery<T, E, C>
where
    E: QueryExecutor,
    C: RowConverter<T>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.has_next() {
            Ok(true) => Some(self.next_value()),
            Ok(false) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let buffered = self.page.len();
        if self.failed {
            (0, Some(0))
        } else if self.is_last_page {
            (buffered, Some(buffered))
        } else {
            (buffered, None)
        }
    }
}

impl<T, E, C> fmt::Debug for PagedQuery<T, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedQuery")
            .field("query", &self.query)
            .field("base_args", &self.base_args)
            .field("window", &self.window)
            .field("is_last_page", &self.is_last_page)
            .field("buffered", &self.page.len())
            .field("pages_fetched", &self.pages_fetched)
            .finish_non_exhaustive()
    }
}
