//! Per-cell cast rules between logical types.
//!
//! A cast either produces a value of the target type or a [`CastError`];
//! callers decide whether a failed cell aborts the whole pass or becomes a
//! null (see [`CoercionPolicy`](crate::schema::CoercionPolicy)).

use super::types::{LogicalType, Value};
use chrono::NaiveDate;
use thiserror::Error;

/// A single cell that could not be cast.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot cast '{value}' to {target}: {reason}")]
pub struct CastError {
    pub value: Value,
    pub target: LogicalType,
    pub reason: String,
}

impl CastError {
    fn new(value: &Value, target: LogicalType, reason: impl Into<String>) -> Self {
        Self {
            value: value.clone(),
            target,
            reason: reason.into(),
        }
    }
}

/// Casts `value` to `target`, returning the value in the representation
/// columns of `target` store.
///
/// Nulls always cast to null.
pub fn cast_value(value: &Value, target: LogicalType) -> Result<Value, CastError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match target {
        LogicalType::Integer32 => to_integer(value, target, i32::MIN as i64, i32::MAX as i64),
        LogicalType::Integer64 => to_integer(value, target, i64::MIN, i64::MAX),
        LogicalType::Float32 => to_float(value, target).and_then(|f| {
            if f.is_finite() && f.abs() > f32::MAX as f64 {
                Err(CastError::new(value, target, "out of range"))
            } else {
                Ok(Value::Float(f as f32 as f64))
            }
        }),
        LogicalType::Float64 => to_float(value, target).map(Value::Float),
        LogicalType::Utf8Text => Ok(Value::Text(value.to_string())),
        LogicalType::Boolean => to_boolean(value),
        LogicalType::Date => to_date(value),
    }
}

fn to_integer(value: &Value, target: LogicalType, min: i64, max: i64) -> Result<Value, CastError> {
    let parsed = match value {
        Value::Int(v) => *v,
        Value::Boolean(v) => *v as i64,
        Value::Float(v) => {
            if !v.is_finite() || v.fract() != 0.0 || *v < min as f64 || *v > max as f64 {
                return Err(CastError::new(value, target, "not an integral value in range"));
            }
            *v as i64
        }
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| CastError::new(value, target, e.to_string()))?,
        Value::Date(_) | Value::Null => {
            return Err(CastError::new(value, target, "unsupported cast"));
        }
    };
    if parsed < min || parsed > max {
        return Err(CastError::new(value, target, "out of range"));
    }
    Ok(Value::Int(parsed))
}

fn to_float(value: &Value, target: LogicalType) -> Result<f64, CastError> {
    match value {
        Value::Float(v) => Ok(*v),
        Value::Int(v) => Ok(*v as f64),
        Value::Boolean(v) => Ok(if *v { 1.0 } else { 0.0 }),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| CastError::new(value, target, e.to_string())),
        Value::Date(_) | Value::Null => Err(CastError::new(value, target, "unsupported cast")),
    }
}

fn to_boolean(value: &Value) -> Result<Value, CastError> {
    let target = LogicalType::Boolean;
    match value {
        Value::Boolean(v) => Ok(Value::Boolean(*v)),
        Value::Int(0) => Ok(Value::Boolean(false)),
        Value::Int(1) => Ok(Value::Boolean(true)),
        Value::Float(v) if *v == 0.0 => Ok(Value::Boolean(false)),
        Value::Float(v) if *v == 1.0 => Ok(Value::Boolean(true)),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(Value::Boolean(true)),
            "false" | "f" | "no" | "n" | "0" => Ok(Value::Boolean(false)),
            _ => Err(CastError::new(value, target, "not a boolean literal")),
        },
        _ => Err(CastError::new(value, target, "unsupported cast")),
    }
}

fn to_date(value: &Value) -> Result<Value, CastError> {
    let target = LogicalType::Date;
    match value {
        Value::Date(d) => Ok(Value::Date(*d)),
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| CastError::new(value, target, e.to_string())),
        _ => Err(CastError::new(value, target, "unsupported cast")),
    }
}
