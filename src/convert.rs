//! Row converters
//!
//! A row converter maps one raw [`Row`] to the caller's value type. Any
//! `Fn(&Row) -> Result<T>` closure is a converter; this module also provides
//! converters for JSON objects, serde-deserializable structs and single
//! columns.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, Row, SqlValue};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Maps one raw row to a typed value
pub trait RowConverter<T> {
    /// Convert a single row
    fn convert(&self, row: &Row) -> Result<T>;
}

impl<T, F> RowConverter<T> for F
where
    F: Fn(&Row) -> Result<T>,
{
    fn convert(&self, row: &Row) -> Result<T> {
        self(row)
    }
}

// ============================================================================
// JSON Converter
// ============================================================================

/// Converts rows to JSON objects keyed by column name
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl RowConverter<JsonObject> for JsonConverter {
    fn convert(&self, row: &Row) -> Result<JsonObject> {
        Ok(row.to_json())
    }
}

// ============================================================================
// Deserialize Converter
// ============================================================================

/// Converts rows into any `DeserializeOwned` type, matching fields by column name
pub struct DeserializeConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> DeserializeConverter<T> {
    /// Create a new deserializing converter
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for DeserializeConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for DeserializeConverter<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for DeserializeConverter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeserializeConverter")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> RowConverter<T> for DeserializeConverter<T> {
    fn convert(&self, row: &Row) -> Result<T> {
        serde_json::from_value(JsonValue::Object(row.to_json())).map_err(|e| {
            Error::conversion(format!(
                "cannot build {} from row: {e}",
                std::any::type_name::<T>()
            ))
        })
    }
}

// ============================================================================
// Column Converter
// ============================================================================

/// Extraction of a Rust value from a single [`SqlValue`]
pub trait FromSqlValue: Sized {
    /// Convert, failing with a conversion error on type mismatch
    fn from_sql_value(value: &SqlValue) -> Result<Self>;
}

fn mismatch<T>(value: &SqlValue) -> Error {
    Error::conversion(format!(
        "expected {}, found {} value {value}",
        std::any::type_name::<T>(),
        value.type_name()
    ))
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        value
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_sql_value(value).map(Some)
        }
    }
}

/// Converts rows by extracting one column
pub struct ColumnConverter<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ColumnConverter<T> {
    /// Extract the column at `index`
    pub fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for ColumnConverter<T> {
    fn clone(&self) -> Self {
        Self::new(self.index)
    }
}

impl<T> std::fmt::Debug for ColumnConverter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnConverter")
            .field("index", &self.index)
            .finish()
    }
}

impl<T: FromSqlValue> RowConverter<T> for ColumnConverter<T> {
    fn convert(&self, row: &Row) -> Result<T> {
        let value = row.get(self.index).ok_or_else(|| {
            Error::conversion(format!(
                "row has {} columns, no column at index {}",
                row.len(),
                self.index
            ))
        })?;
        T::from_sql_value(value)
    }
}

/// Shorthand for [`ColumnConverter::new`]
pub fn column<T: FromSqlValue>(index: usize) -> ColumnConverter<T> {
    ColumnConverter::new(index)
}
