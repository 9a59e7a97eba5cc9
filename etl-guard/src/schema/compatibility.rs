//! Backward-compatibility classification of schema changes.
//!
//! Which type transitions are safe is data, not code: a
//! [`CompatibilityMatrix`] lists the allowed `(from, to)` pairs and the
//! comparator only consults it. Environments with different widening rules
//! extend or replace the matrix.

use super::SchemaDiff;
use crate::table::{LogicalType, Table, TableSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument};

/// The set of type transitions a downstream consumer can absorb.
///
/// Identity transitions are always compatible and need not be listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityMatrix {
    allowed: BTreeSet<(LogicalType, LogicalType)>,
}

impl Default for CompatibilityMatrix {
    fn default() -> Self {
        Self::widening()
    }
}

impl CompatibilityMatrix {
    /// No transitions allowed; every type change is breaking.
    pub fn empty() -> Self {
        Self {
            allowed: BTreeSet::new(),
        }
    }

    /// Numeric widening: Integer32 to Integer64/Float32/Float64, Integer64 to
    /// Float64 and Float32 to Float64. Nothing moves into or out of text.
    pub fn widening() -> Self {
        use crate::table::LogicalType::*;
        Self::empty()
            .allow(Integer32, Integer64)
            .allow(Integer32, Float32)
            .allow(Integer32, Float64)
            .allow(Integer64, Float64)
            .allow(Float32, Float64)
    }

    pub fn allow(mut self, from: LogicalType, to: LogicalType) -> Self {
        self.allowed.insert((from, to));
        self
    }

    pub fn is_compatible(&self, from: LogicalType, to: LogicalType) -> bool {
        from == to || self.allowed.contains(&(from, to))
    }

    pub fn transitions(&self) -> impl Iterator<Item = &(LogicalType, LogicalType)> {
        self.allowed.iter()
    }
}

/// A type change annotated with its compatibility verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityChange {
    pub column: String,
    pub old_type: LogicalType,
    pub new_type: LogicalType,
    pub is_compatible: bool,
}

/// Outcome of comparing an old schema with a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCompatibilityReport {
    pub is_backward_compatible: bool,
    /// Human-readable description of each breaking change
    pub breaking_changes: Vec<String>,
    pub added_columns: Vec<String>,
    pub removed_columns: Vec<String>,
    pub type_changes: Vec<CompatibilityChange>,
}

impl SchemaCompatibilityReport {
    pub fn type_change(&self, column: &str) -> Option<&CompatibilityChange> {
        self.type_changes.iter().find(|c| c.column == column)
    }
}

/// Classifies schema evolution as backward compatible or breaking.
///
/// # Examples
///
/// ```rust
/// use etl_guard::schema::SchemaComparator;
/// use etl_guard::table::{LogicalType, TableSchema};
///
/// let v1 = TableSchema::new().with_field("amount", LogicalType::Integer32);
/// let v2 = TableSchema::new()
///     .with_field("amount", LogicalType::Float64)
///     .with_field("currency", LogicalType::Utf8Text);
///
/// let report = SchemaComparator::new().compare(&v1, &v2);
/// assert!(report.is_backward_compatible);
/// assert_eq!(report.added_columns, vec!["currency"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaComparator {
    matrix: CompatibilityMatrix,
}

impl SchemaComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matrix(matrix: CompatibilityMatrix) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &CompatibilityMatrix {
        &self.matrix
    }

    /// A change is breaking if a column was removed or a type changed along
    /// a transition the matrix does not allow. Added columns never break.
    #[instrument(skip_all, fields(old_columns = old.len(), new_columns = new.len()))]
    pub fn compare(&self, old: &TableSchema, new: &TableSchema) -> SchemaCompatibilityReport {
        let diff = SchemaDiff::between(old, new);

        let mut breaking_changes: Vec<String> = diff
            .removed_columns
            .iter()
            .map(|column| format!("Column '{column}' was removed"))
            .collect();

        let type_changes: Vec<CompatibilityChange> = diff
            .type_changes
            .into_iter()
            .map(|change| CompatibilityChange {
                is_compatible: self.matrix.is_compatible(change.old_type, change.new_type),
                column: change.column,
                old_type: change.old_type,
                new_type: change.new_type,
            })
            .collect();

        breaking_changes.extend(type_changes.iter().filter(|c| !c.is_compatible).map(|c| {
            format!(
                "Column '{}' changed type from {} to {}",
                c.column, c.old_type, c.new_type
            )
        }));

        let report = SchemaCompatibilityReport {
            is_backward_compatible: breaking_changes.is_empty(),
            breaking_changes,
            added_columns: diff.added_columns,
            removed_columns: diff.removed_columns,
            type_changes,
        };
        info!(
            compatible = report.is_backward_compatible,
            breaking = report.breaking_changes.len(),
            "Schema comparison completed"
        );
        report
    }

    /// Compares the schemas of two materialized tables.
    pub fn compare_tables(&self, old: &Table, new: &Table) -> SchemaCompatibilityReport {
        self.compare(&old.schema(), &new.schema())
    }
}
