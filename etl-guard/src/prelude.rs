//! Prelude for commonly used types and traits in etl-guard.

pub use crate::core::{
    Level, ValidationReport, ValidationResult, ValidationRule, Validator, ValidatorConfig,
};
pub use crate::diff::{DataComparator, DiffConfig, DiffResult, DuplicateKeyPolicy};
pub use crate::error::{ErrorContext, EtlError, Result};
pub use crate::logging::LogConfig;
pub use crate::schema::{
    CoercionPolicy, CompatibilityMatrix, SchemaComparator, SchemaDiff, SchemaValidator,
};
pub use crate::table::{Column, LogicalType, Table, TableSchema, Value};
