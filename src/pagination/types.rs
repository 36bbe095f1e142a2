//! Paging window and query inspection

use crate::error::{Error, Result};
use crate::types::SqlValue;

/// Clause appended to every base query
pub const LIMIT_OFFSET: &str = " LIMIT ? OFFSET ?";

/// Empty argument list for queries without placeholders
pub const NO_ARGS: [SqlValue; 0] = [];

/// The `LIMIT`/`OFFSET` pair of one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Rows requested; always the page size
    pub limit: u64,
    /// Rows skipped before this page
    pub offset: u64,
}

impl PageWindow {
    /// Window of the first page
    pub fn first(page_size: u64) -> Self {
        Self {
            limit: page_size,
            offset: 0,
        }
    }

    /// Window of the page after this one
    pub fn next(self) -> Result<Self> {
        let offset = self
            .offset
            .checked_add(self.limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| {
                Error::validation(format!(
                    "offset overflow after {} + {}",
                    self.offset, self.limit
                ))
            })?;
        Ok(Self {
            limit: self.limit,
            offset,
        })
    }

    /// Full argument list: the base arguments followed by limit and offset
    pub fn bind(&self, base: &[SqlValue]) -> Vec<SqlValue> {
        let mut args = Vec::with_capacity(base.len() + 2);
        args.extend_from_slice(base);
        args.push(SqlValue::Int(self.limit as i64));
        args.push(SqlValue::Int(self.offset as i64));
        args
    }
}

/// What a lexical scan of a query found outside literals and comments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryShape {
    /// Number of positional `?` placeholders
    pub placeholders: usize,
    /// A `LIMIT` keyword appears
    pub has_limit: bool,
    /// An `OFFSET` keyword appears
    pub has_offset: bool,
    /// The last significant character is `;`
    pub trailing_semicolon: bool,
}

/// Scan a query, skipping quoted literals, quoted identifiers and comments
///
/// Besides `'...'` and `"..."` with doubled-quote escapes, this understands
/// escape strings (`E'it\'s'`) and dollar-quoted bodies (`$$...$$`,
/// `$tag$...$tag$`).
pub fn inspect_query(sql: &str) -> QueryShape {
    let chars: Vec<char> = sql.chars().collect();
    let mut shape = QueryShape::default();
    let mut last_significant = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '\'' | '"' => {
                i = skip_quoted(&chars, i, c, false);
                last_significant = Some(c);
            }
            '$' => {
                if let Some(tag_end) = dollar_tag_end(&chars, i) {
                    let tag = &chars[i - 1..=tag_end];
                    i = skip_dollar_quoted(&chars, tag_end + 1, tag);
                }
                last_significant = Some(c);
            }
            '-' if chars.get(i) == Some(&'-') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i) == Some(&'*') => {
                i += 1;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            '?' => {
                shape.placeholders += 1;
                last_significant = Some(c);
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i - 1;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                if word.eq_ignore_ascii_case("e") && chars.get(i) == Some(&'\'') {
                    // Escape string: backslash escapes the next character
                    i = skip_quoted(&chars, i + 1, '\'', true);
                } else if word.eq_ignore_ascii_case("limit") {
                    shape.has_limit = true;
                } else if word.eq_ignore_ascii_case("offset") {
                    shape.has_offset = true;
                }
                last_significant = Some(c);
            }
            c if c.is_whitespace() => {}
            c => last_significant = Some(c),
        }
    }

    shape.trailing_semicolon = last_significant == Some(';');
    shape
}

/// Index just past the closing `quote` of a literal whose body starts at `i`
fn skip_quoted(chars: &[char], mut i: usize, quote: char, backslash_escapes: bool) -> usize {
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if backslash_escapes && c == '\\' {
            i += 1;
        } else if c == quote {
            if chars.get(i) == Some(&quote) {
                i += 1;
            } else {
                return i;
            }
        }
    }
    chars.len()
}

/// Index of the `$` closing a dollar-quote tag opened by the `$` before `i`
///
/// `$1` style parameters and bare `$` are not tags.
fn dollar_tag_end(chars: &[char], i: usize) -> Option<usize> {
    let mut j = i;
    if let Some(&first) = chars.get(j) {
        if first.is_alphabetic() || first == '_' {
            j += 1;
            while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                j += 1;
            }
        }
    }
    (chars.get(j) == Some(&'$')).then_some(j)
}

/// Index just past the closing `tag` of a dollar-quoted body starting at `i`
fn skip_dollar_quoted(chars: &[char], i: usize, tag: &[char]) -> usize {
    chars[i..]
        .windows(tag.len())
        .position(|window| window == tag)
        .map_or(chars.len(), |pos| i + pos + tag.len())
}

/// Check the preconditions of a paged query before anything is executed
pub(crate) fn validate(page_size: u64, base_query: &str, arg_count: usize) -> Result<()> {
    if page_size == 0 {
        return Err(Error::validation("page size must be at least 1"));
    }

    if i64::try_from(page_size).is_err() {
        return Err(Error::validation(format!(
            "page size {page_size} does not fit a 64-bit signed LIMIT"
        )));
    }

    if base_query.trim().is_empty() {
        return Err(Error::validation("query is empty"));
    }

    let shape = inspect_query(base_query);

    if shape.has_limit || shape.has_offset {
        return Err(Error::validation(
            "query already contains a LIMIT or OFFSET clause",
        ));
    }

    if shape.trailing_semicolon {
        return Err(Error::validation(
            "query must not end with ';' since LIMIT/OFFSET is appended",
        ));
    }

    if shape.placeholders != arg_count {
        return Err(Error::validation(format!(
            "query has {} placeholders but {} arguments were supplied",
            shape.placeholders, arg_count
        )));
    }

    Ok(())
}
