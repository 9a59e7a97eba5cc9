//! Logical column types and scalar cell values.

use arrow::datatypes::DataType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The closed set of column types a [`Table`](super::Table) can hold.
///
/// Every variant maps to exactly one Arrow data type, so the tag stored on a
/// column and the type of its backing array can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicalType {
    Integer32,
    Integer64,
    Float32,
    Float64,
    Utf8Text,
    Boolean,
    Date,
}

impl LogicalType {
    /// All logical types, in declaration order.
    pub const ALL: [LogicalType; 7] = [
        LogicalType::Integer32,
        LogicalType::Integer64,
        LogicalType::Float32,
        LogicalType::Float64,
        LogicalType::Utf8Text,
        LogicalType::Boolean,
        LogicalType::Date,
    ];

    /// Returns the Arrow data type backing columns of this type.
    pub fn to_arrow(self) -> DataType {
        match self {
            LogicalType::Integer32 => DataType::Int32,
            LogicalType::Integer64 => DataType::Int64,
            LogicalType::Float32 => DataType::Float32,
            LogicalType::Float64 => DataType::Float64,
            LogicalType::Utf8Text => DataType::Utf8,
            LogicalType::Boolean => DataType::Boolean,
            LogicalType::Date => DataType::Date32,
        }
    }

    /// Maps an Arrow data type to its logical type, if one exists.
    pub fn from_arrow(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Int32 => Some(LogicalType::Integer32),
            DataType::Int64 => Some(LogicalType::Integer64),
            DataType::Float32 => Some(LogicalType::Float32),
            DataType::Float64 => Some(LogicalType::Float64),
            DataType::Utf8 => Some(LogicalType::Utf8Text),
            DataType::Boolean => Some(LogicalType::Boolean),
            DataType::Date32 => Some(LogicalType::Date),
            _ => None,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, LogicalType::Integer32 | LogicalType::Integer64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, LogicalType::Float32 | LogicalType::Float64)
    }

    /// Integer and floating point types.
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalType::Integer32 => "Integer32",
            LogicalType::Integer64 => "Integer64",
            LogicalType::Float32 => "Float32",
            LogicalType::Float64 => "Float64",
            LogicalType::Utf8Text => "Utf8Text",
            LogicalType::Boolean => "Boolean",
            LogicalType::Date => "Date",
        };
        f.write_str(name)
    }
}

/// A single cell value.
///
/// Equality and hashing are total: floats compare by bit pattern, so `NaN`
/// equals itself and values can be used as hash-set members. Values of
/// different variants are never equal (`Int(1) != Float(1.0)`).
///
/// Deserialization is untagged: JSON `null`, booleans, integers, floats and
/// strings map to `Null`, `Boolean`, `Int`, `Float` and `Text`. Dates
/// serialize as `YYYY-MM-DD` strings and come back as `Text`; rule
/// evaluation casts parameters to the column type before comparing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The natural logical type of this value, `None` for nulls.
    pub fn logical_type(&self) -> Option<LogicalType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(LogicalType::Boolean),
            Value::Int(_) => Some(LogicalType::Integer64),
            Value::Float(_) => Some(LogicalType::Float64),
            Value::Text(_) => Some(LogicalType::Utf8Text),
            Value::Date(_) => Some(LogicalType::Date),
        }
    }

    /// Numeric view used by range checks.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Bit pattern used for float equality and hashing: `-0.0` equals `0.0` and
/// all NaNs are equal.
fn float_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_bits(*a) == float_bits(*b),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Float(v) => float_bits(*v).hash(state),
            Value::Text(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Days since 1970-01-01, the Arrow `Date32` representation.
pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    // NaiveDate::default() is the Unix epoch
    (date - NaiveDate::default()).num_days() as i32
}

pub(crate) fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::default().checked_add_signed(chrono::Duration::days(days as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_arrow_mapping_round_trips() {
        for ty in LogicalType::ALL {
            assert_eq!(LogicalType::from_arrow(&ty.to_arrow()), Some(ty));
        }
        assert_eq!(LogicalType::from_arrow(&DataType::UInt8), None);
    }

    #[test]
    fn test_value_equality_is_total() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
        assert_eq!(Value::Float(-f64::NAN), Value::Float(f64::NAN));

        let set: HashSet<Value> = [
            Value::Float(f64::NAN),
            Value::Float(f64::NAN),
            Value::Float(0.0),
            Value::Float(-0.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_untagged_deserialization() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 3, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Boolean(true),
                Value::Int(3),
                Value::Float(2.5),
                Value::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_date_days_conversion() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let days = date_to_days(date);
        assert_eq!(days, 19782);
        assert_eq!(days_to_date(days), Some(date));
        assert_eq!(Value::Date(date).to_string(), "2024-02-29");
    }
}
