//! Conversion between native [`SqlValue`]s and the service's typed fields.
//!
//! Numeric policy: integers within the 53-bit safe range
//! (`±(2^53 - 1)`) are sent as `longValue`; integers outside it are sent as
//! `doubleValue` and therefore lose precision beyond 53 bits. This mirrors
//! the number model of the clients the service was designed for and is
//! applied deliberately rather than by silent rounding elsewhere. Floats are
//! always sent as `doubleValue`; NaN and infinities cannot be encoded.
//!
//! On the way back, `longValue` decodes to `Int(i64)` and `doubleValue` to
//! `Float(f64)`, the narrowest native types holding every wire value of that
//! kind exactly.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{DataApiError, Result};
use crate::service::wire::{ArrayValue, ColumnMetadata, Field, SqlParameter, TypeHint};
use crate::types::{Row, SqlValue};

/// Largest integer that survives a round trip through an IEEE-754 double.
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Convert a native value into a named wire parameter.
pub fn to_wire(name: impl Into<String>, value: &SqlValue) -> Result<SqlParameter> {
    let (value, type_hint) = encode_value(value)?;
    Ok(SqlParameter {
        name: name.into(),
        value,
        type_hint,
    })
}

/// Convert an ordered parameter list, naming each parameter by its position.
pub fn to_wire_positional(values: &[SqlValue]) -> Result<Vec<SqlParameter>> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| to_wire(i.to_string(), value))
        .collect()
}

/// Encode a single value. Null never carries a type hint.
pub fn encode_value(value: &SqlValue) -> Result<(Field, Option<TypeHint>)> {
    let encoded = match value {
        SqlValue::Null => (Field::null(), None),
        SqlValue::Bool(b) => (Field::BooleanValue(*b), None),
        SqlValue::Int(i) if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(i) => {
            (Field::LongValue(*i), None)
        }
        SqlValue::Int(i) => (Field::DoubleValue(*i as f64), None),
        SqlValue::Float(f) if f.is_finite() => (Field::DoubleValue(*f), None),
        SqlValue::Float(f) => {
            return Err(DataApiError::Marshal(format!(
                "cannot encode non-finite float {}",
                f
            )))
        }
        SqlValue::Text(s) => (Field::StringValue(s.clone()), None),
        SqlValue::Bytes(b) => (Field::BlobValue(b.clone()), None),
        SqlValue::Date(d) => (
            Field::StringValue(d.format(DATE_FORMAT).to_string()),
            Some(TypeHint::Date),
        ),
        SqlValue::Time(t) => (
            Field::StringValue(t.format(TIME_FORMAT).to_string()),
            Some(TypeHint::Time),
        ),
        SqlValue::Timestamp(ts) => (
            Field::StringValue(ts.format(TIMESTAMP_FORMAT).to_string()),
            Some(TypeHint::Timestamp),
        ),
        SqlValue::Decimal(s) => (Field::StringValue(s.clone()), Some(TypeHint::Decimal)),
        SqlValue::Uuid(s) => (Field::StringValue(s.clone()), Some(TypeHint::Uuid)),
        SqlValue::Json(v) => (Field::StringValue(v.to_string()), Some(TypeHint::Json)),
        SqlValue::Array(_) => {
            return Err(DataApiError::Marshal(
                "array parameters are not supported by the service".to_string(),
            ))
        }
    };
    Ok(encoded)
}

/// Convert a wire field back into a native value.
pub fn from_wire(field: Field) -> Result<SqlValue> {
    match field {
        Field::IsNull(true) => Ok(SqlValue::Null),
        Field::IsNull(false) => Err(DataApiError::Marshal(
            "field has isNull=false and no value".to_string(),
        )),
        Field::StringValue(s) => Ok(SqlValue::Text(s)),
        Field::LongValue(i) => Ok(SqlValue::Int(i)),
        Field::DoubleValue(f) => Ok(SqlValue::Float(f)),
        Field::BooleanValue(b) => Ok(SqlValue::Bool(b)),
        Field::BlobValue(b) => Ok(SqlValue::Bytes(b)),
        Field::ArrayValue(array) => Ok(decode_array(array)),
    }
}

fn decode_array(array: ArrayValue) -> SqlValue {
    let values = match array {
        ArrayValue::BooleanValues(v) => v.into_iter().map(SqlValue::Bool).collect(),
        ArrayValue::LongValues(v) => v.into_iter().map(SqlValue::Int).collect(),
        ArrayValue::DoubleValues(v) => v.into_iter().map(SqlValue::Float).collect(),
        ArrayValue::StringValues(v) => v.into_iter().map(SqlValue::Text).collect(),
        ArrayValue::ArrayValues(v) => v.into_iter().map(decode_array).collect(),
    };
    SqlValue::Array(values)
}

/// Decode a field using its column's engine type.
///
/// Date/time, exact numeric, uuid and json columns arrive as strings; they
/// are parsed into their native kinds when the text is well formed and left
/// as `Text` otherwise.
pub fn from_wire_typed(field: Field, column: Option<&ColumnMetadata>) -> Result<SqlValue> {
    let value = from_wire(field)?;
    let (SqlValue::Text(text), Some(type_name)) =
        (&value, column.and_then(|c| c.type_name.as_deref()))
    else {
        return Ok(value);
    };

    let refined = match type_name.to_ascii_lowercase().as_str() {
        "date" => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .ok()
            .map(SqlValue::Date),
        "time" => NaiveTime::parse_from_str(text, TIME_FORMAT)
            .ok()
            .map(SqlValue::Time),
        "timestamp" | "datetime" => NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
            .ok()
            .map(SqlValue::Timestamp),
        "numeric" | "decimal" => Some(SqlValue::Decimal(text.clone())),
        "uuid" => Some(SqlValue::Uuid(text.clone())),
        "json" | "jsonb" => serde_json::from_str(text).ok().map(SqlValue::Json),
        _ => None,
    };
    Ok(refined.unwrap_or(value))
}

/// Decode the records of a result set into rows keyed by column label.
///
/// Empty records are skipped. Columns without metadata are keyed by
/// position.
pub fn decode_records(records: Vec<Vec<Field>>, columns: &[ColumnMetadata]) -> Result<Vec<Row>> {
    let names = column_names(columns);
    records
        .into_iter()
        .filter(|record| !record.is_empty())
        .map(|record| {
            if !columns.is_empty() && record.len() != columns.len() {
                return Err(DataApiError::Marshal(format!(
                    "record has {} fields but result has {} columns",
                    record.len(),
                    columns.len()
                )));
            }
            let values = record
                .into_iter()
                .enumerate()
                .map(|(i, field)| {
                    let name = names.get(i).cloned().unwrap_or_else(|| i.to_string());
                    from_wire_typed(field, columns.get(i)).map(|value| (name, value))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Row::new(values))
        })
        .collect()
}

/// Column labels in result order.
pub fn column_names(columns: &[ColumnMetadata]) -> Vec<String> {
    columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            c.column_label()
                .map(str::to_string)
                .unwrap_or_else(|| i.to_string())
        })
        .collect()
}
