use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{DataApiError, Result};
use crate::types::SqlValue;

/// A single decoded row: an ordered mapping of column label to value.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<(String, SqlValue)>,
}

impl Row {
    /// Creates a new Row from labelled values in column order.
    pub fn new(values: Vec<(String, SqlValue)>) -> Self {
        Self { values }
    }

    /// Gets a value by column label.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .ok_or_else(|| DataApiError::ColumnNotFound(column.to_string()))
    }

    /// Gets a value by column label and converts it to `T`.
    pub fn get_as<T: FromSqlValue>(&self, column: &str) -> Result<T> {
        let value = self.get(column)?;
        T::from_sql_value(value).ok_or_else(|| DataApiError::TypeMismatch {
            column: column.to_string(),
            expected: T::EXPECTED,
            found: value.kind_name(),
        })
    }

    /// Gets a value by position.
    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index).map(|(_, value)| value)
    }

    /// Returns all column labels in this row, in order.
    pub fn columns(&self) -> Vec<&str> {
        self.values.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Iterates over `(label, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Conversion from a decoded value into a Rust type.
pub trait FromSqlValue: Sized {
    const EXPECTED: &'static str;

    fn from_sql_value(value: &SqlValue) -> Option<Self>;
}

impl FromSqlValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_i64()
    }
}

impl FromSqlValue for i32 {
    const EXPECTED: &'static str = "int";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_i64().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromSqlValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromSqlValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromSqlValue for String {
    const EXPECTED: &'static str = "text";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromSqlValue for Vec<u8> {
    const EXPECTED: &'static str = "bytes";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        value.as_bytes().map(<[u8]>::to_vec)
    }
}

impl FromSqlValue for NaiveDate {
    const EXPECTED: &'static str = "date";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl FromSqlValue for NaiveTime {
    const EXPECTED: &'static str = "time";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl FromSqlValue for NaiveDateTime {
    const EXPECTED: &'static str = "timestamp";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl FromSqlValue for serde_json::Value {
    const EXPECTED: &'static str = "json";

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Json(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_sql_value(value).map(Some)
        }
    }
}

/// Result of executing one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    columns: Vec<String>,
    rows: Vec<Row>,
    affected_rows: u64,
    generated_id: Option<SqlValue>,
}

impl ExecutionResult {
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Row>,
        affected_rows: u64,
        generated_id: Option<SqlValue>,
    ) -> Self {
        Self {
            columns,
            rows,
            affected_rows,
            generated_id,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Extracts a single row from the result.
    /// Returns an error if the result contains zero or more than one row.
    pub fn single_row(self) -> Result<Row> {
        if self.rows.len() != 1 {
            return Err(DataApiError::UnexpectedRowCount {
                expected: 1,
                actual: self.rows.len(),
            });
        }
        self.rows
            .into_iter()
            .next()
            .ok_or(DataApiError::UnexpectedRowCount {
                expected: 1,
                actual: 0,
            })
    }

    /// Returns all rows from the result.
    pub fn rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns a reference to the rows without consuming the result.
    pub fn rows_ref(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the column labels of the result set.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows inserted, updated or deleted by the statement.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Identifier generated by the statement (e.g. an auto-increment key), if reported.
    pub fn generated_id(&self) -> Option<&SqlValue> {
        self.generated_id.as_ref()
    }

    /// Returns the number of rows in this result.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
