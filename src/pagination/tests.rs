//! Tests for pagination module

use super::*;
use crate::convert::{column, ColumnConverter};
use crate::error::{Error, Result};
use crate::executor::QueryExecutor;
use crate::types::{Row, SqlValue};
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use test_case::test_case;

const BASE_QUERY: &str = "select * from foo where name = ? and size > ?";

/// In-memory table that answers `LIMIT ? OFFSET ?` queries and records every call
struct TableExecutor {
    rows: Vec<i64>,
    calls: RefCell<Vec<(String, Vec<SqlValue>)>>,
    fail_at_offset: Option<u64>,
    failures_left: Cell<u32>,
}

impl TableExecutor {
    fn with_rows(count: i64) -> Self {
        Self {
            rows: (0..count).collect(),
            calls: RefCell::new(Vec::new()),
            fail_at_offset: None,
            failures_left: Cell::new(u32::MAX),
        }
    }

    fn failing_once_at(count: i64, offset: u64) -> Self {
        Self {
            fail_at_offset: Some(offset),
            failures_left: Cell::new(1),
            ..Self::with_rows(count)
        }
    }

    fn failing_at(count: i64, offset: u64) -> Self {
        Self {
            fail_at_offset: Some(offset),
            ..Self::with_rows(count)
        }
    }

    fn fetches(&self) -> usize {
        self.calls.borrow().len()
    }

    fn offsets(&self) -> Vec<i64> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|(_, args)| args.last()?.as_i64())
            .collect()
    }
}

impl QueryExecutor for TableExecutor {
    fn execute(&self, query: &str, args: &[SqlValue]) -> Result<Vec<Row>> {
        self.calls
            .borrow_mut()
            .push((query.to_string(), args.to_vec()));

        let [.., limit, offset] = args else {
            return Err(Error::data_access("missing limit/offset arguments"));
        };
        let limit = limit.as_i64().unwrap_or_default() as usize;
        let offset = offset.as_i64().unwrap_or_default() as usize;

        if self.fail_at_offset == Some(offset as u64) && self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(Error::data_access("connection reset"));
        }

        Ok(self
            .rows
            .iter()
            .skip(offset)
            .take(limit)
            .map(|v| Row::single(*v))
            .collect())
    }
}

fn base_args() -> Vec<SqlValue> {
    vec![SqlValue::from("someArgument"), SqlValue::Int(12)]
}

type TableQuery<'a> = PagedQuery<i64, &'a TableExecutor, ColumnConverter<i64>>;

fn open(page_size: u64, executor: &TableExecutor) -> TableQuery<'_> {
    PagedQuery::new(page_size, executor, BASE_QUERY, column::<i64>(0), base_args()).unwrap()
}

fn drain(sequence: &mut TableQuery<'_>) -> Vec<i64> {
    let mut results = Vec::new();
    while sequence.has_next().unwrap() {
        results.push(sequence.next_value().unwrap());
    }
    results
}

// ============================================================================
// Draining
// ============================================================================

#[test_case(3, 4 ; "multiple pages")]
#[test_case(11, 2 ; "page size equals table size")]
#[test_case(12, 1 ; "page size exceeds table size")]
#[test_case(1, 12 ; "single row pages")]
fn test_full_read(page_size: u64, expected_fetches: usize) {
    let executor = TableExecutor::with_rows(11);
    let mut sequence = open(page_size, &executor);

    let results = drain(&mut sequence);

    assert_eq!(results, (0..11).collect::<Vec<_>>());
    assert_eq!(executor.fetches(), expected_fetches);
    assert_eq!(sequence.pages_fetched(), expected_fetches as u64);
}

#[test]
fn test_empty_table() {
    let executor = TableExecutor::with_rows(0);
    let mut sequence = open(1, &executor);

    assert!(drain(&mut sequence).is_empty());
    assert_eq!(executor.fetches(), 1);
    assert!(sequence.is_last_page());
}

#[test]
fn test_fetch_count_for_all_sizes() {
    for rows in 0..=20i64 {
        for page_size in 1..=7u64 {
            let executor = TableExecutor::with_rows(rows);
            let mut sequence = open(page_size, &executor);
            let results = drain(&mut sequence);

            let n = rows as u64;
            let expected = if n % page_size == 0 {
                n / page_size + 1
            } else {
                n.div_ceil(page_size)
            };

            assert_eq!(results, (0..rows).collect::<Vec<_>>(), "rows={rows} page={page_size}");
            assert_eq!(
                executor.fetches() as u64,
                expected,
                "rows={rows} page={page_size}"
            );
        }
    }
}

#[test]
fn test_iterator_collect() {
    let executor = TableExecutor::with_rows(11);
    let sequence = open(4, &executor);

    let results: Vec<i64> = sequence.collect::<Result<_>>().unwrap();
    assert_eq!(results, (0..11).collect::<Vec<_>>());
    assert_eq!(executor.fetches(), 3);
}

// ============================================================================
// Lazy fetching
// ============================================================================

#[test]
fn test_construction_fetches_first_page_only() {
    let executor = TableExecutor::with_rows(11);
    let sequence = open(3, &executor);

    assert_eq!(executor.fetches(), 1);
    assert_eq!(sequence.buffered(), 3);
    assert_eq!(sequence.offset(), 0);
    assert!(!sequence.is_last_page());
}

#[test]
fn test_has_next_is_idempotent() {
    let executor = TableExecutor::with_rows(11);
    let mut sequence = open(3, &executor);

    for _ in 0..5 {
        assert!(sequence.has_next().unwrap());
    }
    assert_eq!(executor.fetches(), 1);
    assert_eq!(sequence.next_value().unwrap(), 0);

    // Exhaust the first page, then poll repeatedly across the boundary
    sequence.next_value().unwrap();
    sequence.next_value().unwrap();
    for _ in 0..5 {
        assert!(sequence.has_next().unwrap());
    }
    assert_eq!(executor.fetches(), 2);
    assert_eq!(sequence.next_value().unwrap(), 3);
}

#[test]
fn test_no_fetch_after_last_page() {
    let executor = TableExecutor::with_rows(11);
    let mut sequence = open(11, &executor);
    drain(&mut sequence);
    assert_eq!(executor.fetches(), 2);

    for _ in 0..3 {
        assert!(!sequence.has_next().unwrap());
    }
    assert_eq!(executor.fetches(), 2);
}

#[test]
fn test_next_value_without_data() {
    let executor = TableExecutor::with_rows(2);
    let mut sequence = open(5, &executor);
    drain(&mut sequence);

    let err = sequence.next_value().unwrap_err();
    assert!(matches!(err, Error::NoSuchElement { .. }));
}

#[test]
fn test_next_value_does_not_fetch() {
    let executor = TableExecutor::with_rows(4);
    let mut sequence = open(2, &executor);
    sequence.next_value().unwrap();
    sequence.next_value().unwrap();

    assert!(matches!(
        sequence.next_value().unwrap_err(),
        Error::NoSuchElement { .. }
    ));
    assert_eq!(executor.fetches(), 1);
    assert_eq!(sequence.next().transpose().unwrap(), Some(2));
}

// ============================================================================
// Query rewriting
// ============================================================================

#[test]
fn test_query_and_trailing_arguments() {
    let executor = TableExecutor::with_rows(11);
    let mut sequence = open(3, &executor);
    drain(&mut sequence);

    let expected_query = format!("{BASE_QUERY} LIMIT ? OFFSET ?");
    assert_eq!(sequence.query(), expected_query);

    let calls = executor.calls.borrow();
    for (i, (query, args)) in calls.iter().enumerate() {
        assert_eq!(query, &expected_query);
        let mut expected_args = base_args();
        expected_args.push(SqlValue::Int(3));
        expected_args.push(SqlValue::Int(3 * i as i64));
        assert_eq!(args, &expected_args);
    }
    drop(calls);

    assert_eq!(executor.offsets(), vec![0, 3, 6, 9]);
    assert_eq!(sequence.offset(), 9);
    assert_eq!(sequence.base_args(), base_args().as_slice());
}

#[test]
fn test_page_window() {
    let window = PageWindow::first(5);
    assert_eq!(window, PageWindow { limit: 5, offset: 0 });

    let next = window.next().unwrap();
    assert_eq!(next.offset, 5);
    assert_eq!(
        next.bind(&[SqlValue::Bool(true)]),
        vec![SqlValue::Bool(true), SqlValue::Int(5), SqlValue::Int(5)]
    );

    let edge = PageWindow {
        limit: 10,
        offset: i64::MAX as u64 - 5,
    };
    assert!(edge.next().is_err());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_inspect_query() {
    let shape = inspect_query("SELECT * FROM t WHERE a = ? AND b = ?");
    assert_eq!(
        shape,
        QueryShape {
            placeholders: 2,
            ..QueryShape::default()
        }
    );

    let shape = inspect_query("select id from t order by id limit 10");
    assert!(shape.has_limit);

    let shape = inspect_query("SELECT id FROM t Offset 3");
    assert!(shape.has_offset);

    let shape = inspect_query("SELECT 1;  -- done\n");
    assert!(shape.trailing_semicolon);
}

#[test]
fn test_inspect_query_skips_literals_and_comments() {
    let shape = inspect_query(
        "SELECT 'limit ?', \"offset\" FROM t /* limit ? */ WHERE note = 'it''s ?' -- offset ?\n AND x = ?",
    );
    assert_eq!(
        shape,
        QueryShape {
            placeholders: 1,
            ..QueryShape::default()
        }
    );

    // Identifiers that merely contain the keywords are fine
    let shape = inspect_query("SELECT rate_limit, offsets FROM t");
    assert!(!shape.has_limit);
    assert!(!shape.has_offset);

    // Dollar-quoted bodies, tagged or not
    let shape = inspect_query("SELECT $$it's ? limit$$ AS s FROM t WHERE id = ?");
    assert_eq!(shape.placeholders, 1);
    assert!(!shape.has_limit);
    let shape = inspect_query("SELECT $fn$ a $$ ? $fn$, $1 FROM t WHERE id = ? LIMIT 3");
    assert_eq!(shape.placeholders, 1);
    assert!(shape.has_limit);

    // Escape strings treat backslash-quote as part of the literal
    let shape = inspect_query(r"SELECT E'it\'s ?' AS s FROM t WHERE id = ?");
    assert_eq!(shape.placeholders, 1);
    let shape = inspect_query(r"SELECT e'\\' FROM t WHERE id = ? OFFSET 2");
    assert_eq!(shape.placeholders, 1);
    assert!(shape.has_offset);

    // A comment opener does not close itself
    let shape = inspect_query("SELECT ? /*/ ? */ FROM t");
    assert_eq!(shape.placeholders, 1);

    // A plain literal ending in a backslash is closed by its quote
    let shape = inspect_query(r"SELECT 'C:\' FROM t WHERE id = ?");
    assert_eq!(shape.placeholders, 1);
}

#[test_case(0, BASE_QUERY, 2 ; "zero page size")]
#[test_case(5, "select * from foo limit 10", 0 ; "limit in query")]
#[test_case(5, "select * from foo OFFSET 10", 0 ; "offset in query")]
#[test_case(5, "select * from foo;", 0 ; "trailing semicolon")]
#[test_case(5, "   ", 0 ; "empty query")]
#[test_case(5, BASE_QUERY, 4 ; "limit and offset passed as arguments")]
#[test_case(5, BASE_QUERY, 1 ; "too few arguments")]
fn test_validation_fails_fast(page_size: u64, query: &str, arg_count: usize) {
    let executor = TableExecutor::with_rows(11);
    let args: Vec<SqlValue> = (0..arg_count as i64).map(SqlValue::Int).collect();

    let result = PagedQuery::new(page_size, &executor, query, column::<i64>(0), args);

    assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
    assert_eq!(executor.fetches(), 0);
}

#[test]
fn test_no_args() {
    let executor = TableExecutor::with_rows(3);
    let sequence =
        PagedQuery::new(2, &executor, "select * from foo", column::<i64>(0), NO_ARGS).unwrap();
    assert_eq!(sequence.collect::<Result<Vec<_>>>().unwrap(), vec![0, 1, 2]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_construction_propagates_executor_error() {
    let executor = TableExecutor::failing_at(11, 0);
    let result = PagedQuery::new(3, &executor, BASE_QUERY, column::<i64>(0), base_args());

    let err = result.unwrap_err();
    assert!(err.is_data_access());
    assert_eq!(err.to_string(), "Query failed: connection reset");
}

#[test]
fn test_later_fetch_error_keeps_offset() {
    let executor = TableExecutor::failing_at(11, 6);
    let mut sequence = open(3, &executor);

    for _ in 0..6 {
        assert!(sequence.has_next().unwrap());
        sequence.next_value().unwrap();
    }

    assert!(sequence.has_next().unwrap_err().is_data_access());
    assert_eq!(sequence.offset(), 3);
    assert_eq!(sequence.pages_fetched(), 2);
}

#[test]
fn test_iterator_fuses_after_error() {
    let executor = TableExecutor::failing_at(11, 3);
    let mut sequence = open(3, &executor);

    let items: Vec<Result<i64>> = sequence.by_ref().collect();
    assert_eq!(items.len(), 4);
    assert!(items[..3].iter().all(std::result::Result::is_ok));
    assert!(items[3].is_err());

    assert!(sequence.next().is_none());
    assert_eq!(sequence.size_hint(), (0, Some(0)));
}

#[test]
fn test_iterator_resumes_after_successful_retry() {
    let executor = TableExecutor::failing_once_at(11, 3);
    let mut sequence = open(3, &executor);

    let items: Vec<Result<i64>> = sequence.by_ref().collect();
    assert_eq!(items.len(), 4);
    assert!(items[3].is_err());
    assert!(sequence.next().is_none());

    // Retrying the failed page through has_next makes its rows reachable again
    assert!(sequence.has_next().unwrap());
    assert_eq!(sequence.offset(), 3);
    assert_eq!(
        sequence.collect::<Result<Vec<_>>>().unwrap(),
        (3..11).collect::<Vec<_>>()
    );
    assert_eq!(executor.offsets(), vec![0, 3, 3, 6, 9]);
}

#[test]
fn test_conversion_error_surfaces_during_fetch() {
    let executor = TableExecutor::with_rows(11);
    let converter = |row: &Row| -> Result<i64> {
        let value = row.get(0).and_then(SqlValue::as_i64).unwrap_or_default();
        if value == 7 {
            Err(Error::conversion("row 7 is corrupt"))
        } else {
            Ok(value)
        }
    };
    let mut sequence = PagedQuery::new(3, &executor, BASE_QUERY, converter, base_args()).unwrap();

    // Page [6, 7, 8] is converted as a whole when fetched
    for _ in 0..6 {
        assert!(sequence.has_next().unwrap());
        sequence.next_value().unwrap();
    }
    assert_eq!(executor.fetches(), 2);
    assert!(matches!(
        sequence.has_next().unwrap_err(),
        Error::Conversion { .. }
    ));
    assert_eq!(executor.fetches(), 3);
}
