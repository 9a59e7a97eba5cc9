//! Error types for the etl-guard library.
//!
//! Violation findings (a failed rule, a diff with changes) are never errors;
//! they are ordinary results. `EtlError` covers the conditions where no
//! sensible answer can be produced: bad comparison preconditions, strict
//! coercion failures, malformed input tables and Arrow failures.

use crate::table::LogicalType;
use thiserror::Error;

/// Which side of a two-table comparison an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSide {
    Source,
    Target,
}

impl std::fmt::Display for TableSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSide::Source => write!(f, "source"),
            TableSide::Target => write!(f, "target"),
        }
    }
}

/// The main error type for the etl-guard library.
#[derive(Error, Debug)]
pub enum EtlError {
    /// A comparison was requested without any key columns.
    #[error("At least one key column is required to compare tables")]
    EmptyKeyColumns,

    /// A key column is missing from one of the compared tables.
    #[error("Key column '{column}' not found in {side} table")]
    KeyColumnNotFound { column: String, side: TableSide },

    /// A key column has different logical types on the two sides.
    #[error("Key column '{column}' has type {source_type} in source but {target_type} in target")]
    KeyTypeMismatch {
        column: String,
        source_type: LogicalType,
        target_type: LogicalType,
    },

    /// After applying keys and ignore lists there is nothing left to compare.
    #[error("No columns left to compare after excluding key and ignored columns")]
    NoColumnsToCompare,

    /// Duplicate key values were found while duplicates are rejected.
    #[error("{side} table has {duplicates} rows with a duplicated key")]
    DuplicateKeys { side: TableSide, duplicates: usize },

    /// A required column is not present.
    #[error("Column '{column}' not found in table")]
    ColumnNotFound { column: String },

    /// A cell could not be cast while coercion runs in strict mode.
    #[error("Cannot cast value '{value}' in column '{column}' (row {row}) to {target}")]
    Coercion {
        column: String,
        row: usize,
        value: String,
        target: LogicalType,
    },

    /// An Arrow data type with no logical type counterpart.
    #[error("Unsupported data type for column '{column}': {data_type}")]
    UnsupportedType { column: String, data_type: String },

    /// A table could not be assembled from the given columns.
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A user supplied pattern or identifier was rejected.
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        EtlError::Serialization(err.to_string())
    }
}

/// A type alias for `Result<T, EtlError>`.
pub type Result<T> = std::result::Result<T, EtlError>;

impl EtlError {
    /// Creates a column-not-found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Returns true for errors caused by the caller's comparison parameters
    /// rather than by the data itself.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            EtlError::EmptyKeyColumns
                | EtlError::KeyColumnNotFound { .. }
                | EtlError::KeyTypeMismatch { .. }
                | EtlError::NoColumnsToCompare
                | EtlError::ColumnNotFound { .. }
        )
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<EtlError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            EtlError::Internal(inner) => EtlError::Internal(format!("{msg}: {inner}")),
            other => EtlError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                EtlError::Internal(inner) => EtlError::Internal(format!("{msg}: {inner}")),
                other => EtlError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_column_not_found() {
        let err = EtlError::KeyColumnNotFound {
            column: "id".to_string(),
            side: TableSide::Target,
        };
        assert_eq!(err.to_string(), "Key column 'id' not found in target table");
        assert!(err.is_precondition());
    }

    #[test]
    fn test_coercion_message() {
        let err = EtlError::Coercion {
            column: "age".to_string(),
            row: 3,
            value: "abc".to_string(),
            target: LogicalType::Integer64,
        };
        assert_eq!(
            err.to_string(),
            "Cannot cast value 'abc' in column 'age' (row 3) to Integer64"
        );
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: EtlError = parse.unwrap_err().into();
        assert!(matches!(err, EtlError::Serialization(_)));
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(EtlError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation()
            .context("During table diff")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Internal error: During table diff: Something went wrong"
        );
    }
}
