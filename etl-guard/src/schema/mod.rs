//! Schema checks: expected-schema validation with coercion, and
//! backward-compatibility classification of schema changes.

mod compatibility;
mod validator;

pub use compatibility::{
    CompatibilityChange, CompatibilityMatrix, SchemaCompatibilityReport, SchemaComparator,
};
pub use validator::{CoercionFailure, CoercionPolicy, CoercionReport, SchemaResult, SchemaValidator};

use crate::table::{LogicalType, TableSchema};
use serde::{Deserialize, Serialize};

/// A column present on both sides whose type differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypeChange {
    pub column: String,
    pub old_type: LogicalType,
    pub new_type: LogicalType,
}

/// Name and type differences between two schemas, independent of row data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub schemas_match: bool,
    /// Columns only in the new (target) schema, in its order
    pub added_columns: Vec<String>,
    /// Columns only in the old (source) schema, in its order
    pub removed_columns: Vec<String>,
    /// Common columns whose type changed, in old-schema order
    pub type_changes: Vec<ColumnTypeChange>,
}

impl SchemaDiff {
    pub fn between(old: &TableSchema, new: &TableSchema) -> Self {
        let added_columns: Vec<String> = new
            .names()
            .filter(|name| !old.contains(name))
            .map(str::to_string)
            .collect();

        let mut removed_columns = Vec::new();
        let mut type_changes = Vec::new();
        for field in old.fields() {
            match new.get(&field.name) {
                None => removed_columns.push(field.name.clone()),
                Some(new_type) if new_type != field.logical_type => {
                    type_changes.push(ColumnTypeChange {
                        column: field.name.clone(),
                        old_type: field.logical_type,
                        new_type,
                    })
                }
                Some(_) => {}
            }
        }

        Self {
            schemas_match: added_columns.is_empty()
                && removed_columns.is_empty()
                && type_changes.is_empty(),
            added_columns,
            removed_columns,
            type_changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_diff() {
        let old = TableSchema::new()
            .with_field("id", LogicalType::Integer64)
            .with_field("name", LogicalType::Utf8Text)
            .with_field("score", LogicalType::Float32);
        let new = TableSchema::new()
            .with_field("score", LogicalType::Float64)
            .with_field("id", LogicalType::Integer64)
            .with_field("created", LogicalType::Date);

        let diff = SchemaDiff::between(&old, &new);
        assert!(!diff.schemas_match);
        assert_eq!(diff.added_columns, vec!["created"]);
        assert_eq!(diff.removed_columns, vec!["name"]);
        assert_eq!(
            diff.type_changes,
            vec![ColumnTypeChange {
                column: "score".to_string(),
                old_type: LogicalType::Float32,
                new_type: LogicalType::Float64,
            }]
        );
        assert!(SchemaDiff::between(&old, &old).schemas_match);
    }
}
