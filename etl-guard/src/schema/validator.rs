//! Validation of a table against an expected schema, and type coercion.

use crate::error::{EtlError, Result};
use crate::table::{cast_value, Column, LogicalType, Table, TableSchema, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// What happens to a cell that cannot be cast to the expected type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPolicy {
    /// The cell becomes null and the failure is recorded.
    #[default]
    NullOnFailure,
    /// The first failing cell aborts coercion with [`EtlError::Coercion`].
    Strict,
}

/// Outcome of [`SchemaValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaResult {
    pub passed: bool,
    pub message: String,
    /// Expected columns absent from the table, in expected order
    pub missing_columns: Vec<String>,
    /// Table columns the expected schema does not mention; informational only
    pub extra_columns: Vec<String>,
}

/// One cell that failed to cast under [`CoercionPolicy::NullOnFailure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercionFailure {
    pub column: String,
    pub row: usize,
    pub value: Value,
    pub target: LogicalType,
    pub reason: String,
}

/// Record of a coercion pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoercionReport {
    /// Columns whose type was changed, in table order
    pub coerced_columns: Vec<String>,
    pub failures: Vec<CoercionFailure>,
}

impl CoercionReport {
    /// True when no cell was nulled by a failed cast.
    pub fn is_lossless(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Checks tables against an expected schema and coerces them into it.
///
/// # Examples
///
/// ```rust
/// use etl_guard::schema::SchemaValidator;
/// use etl_guard::table::{Column, LogicalType, Table, TableSchema};
///
/// let expected = TableSchema::new().with_field("id", LogicalType::Integer64);
/// let validator = SchemaValidator::new(expected);
///
/// let raw = Table::builder()
///     .column(Column::utf8("id", [Some("1"), Some("2")]))
///     .build()
///     .unwrap();
/// assert!(!validator.validate(&raw).passed);
///
/// let coerced = validator.coerce_types(&raw).unwrap();
/// assert!(validator.validate(&coerced).passed);
/// ```
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    expected: TableSchema,
    policy: CoercionPolicy,
}

impl SchemaValidator {
    pub fn new(expected: TableSchema) -> Self {
        Self {
            expected,
            policy: CoercionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CoercionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn expected(&self) -> &TableSchema {
        &self.expected
    }

    pub fn policy(&self) -> CoercionPolicy {
        self.policy
    }

    /// Missing columns fail first; otherwise the first type mismatch in
    /// expected order fails. Extra columns are allowed.
    pub fn validate(&self, table: &Table) -> SchemaResult {
        let missing_columns: Vec<String> = self
            .expected
            .names()
            .filter(|name| !table.has_column(name))
            .map(str::to_string)
            .collect();
        let extra_columns: Vec<String> = table
            .column_names()
            .into_iter()
            .filter(|name| !self.expected.contains(name))
            .map(str::to_string)
            .collect();

        if !missing_columns.is_empty() {
            let message = format!("Missing columns: {}", missing_columns.join(", "));
            return SchemaResult {
                passed: false,
                message,
                missing_columns,
                extra_columns,
            };
        }

        let mismatch = self.expected.fields().iter().find_map(|field| {
            let actual = table.column(&field.name)?.logical_type();
            (actual != field.logical_type).then(|| {
                format!(
                    "{} expected {} got {}",
                    field.name, field.logical_type, actual
                )
            })
        });

        match mismatch {
            Some(message) => SchemaResult {
                passed: false,
                message,
                missing_columns,
                extra_columns,
            },
            None => SchemaResult {
                passed: true,
                message: "Schema matches expected schema".to_string(),
                missing_columns,
                extra_columns,
            },
        }
    }

    /// Returns a new table whose columns have the expected types.
    pub fn coerce_types(&self, table: &Table) -> Result<Table> {
        self.coerce_types_with_report(table).map(|(table, _)| table)
    }

    /// Like [`coerce_types`](Self::coerce_types), also returning every cell
    /// that was nulled by a failed cast.
    ///
    /// Columns absent from the expected schema, and columns already of the
    /// expected type, are carried over unchanged.
    #[instrument(skip_all, fields(rows = table.row_count(), policy = ?self.policy))]
    pub fn coerce_types_with_report(&self, table: &Table) -> Result<(Table, CoercionReport)> {
        let mut report = CoercionReport::default();
        let mut columns = Vec::with_capacity(table.num_columns());

        for column in table.columns() {
            match self.expected.get(column.name()) {
                Some(target) if target != column.logical_type() => {
                    debug!(
                        column = column.name(),
                        from = %column.logical_type(),
                        to = %target,
                        "Coercing column"
                    );
                    columns.push(self.coerce_column(column, target, &mut report)?);
                    report.coerced_columns.push(column.name().to_string());
                }
                _ => columns.push(column.clone()),
            }
        }

        if !report.is_lossless() {
            warn!(
                failures = report.failures.len(),
                "Coercion replaced unparsable values with nulls"
            );
        }
        Ok((Table::try_new(columns)?, report))
    }

    fn coerce_column(
        &self,
        column: &Column,
        target: LogicalType,
        report: &mut CoercionReport,
    ) -> Result<Column> {
        let mut values = Vec::with_capacity(column.len());
        for row in 0..column.len() {
            let value = column.value(row);
            match cast_value(&value, target) {
                Ok(cast) => values.push(cast),
                Err(err) => match self.policy {
                    CoercionPolicy::Strict => {
                        return Err(EtlError::Coercion {
                            column: column.name().to_string(),
                            row,
                            value: value.to_string(),
                            target,
                        });
                    }
                    CoercionPolicy::NullOnFailure => {
                        report.failures.push(CoercionFailure {
                            column: column.name().to_string(),
                            row,
                            value,
                            target,
                            reason: err.reason,
                        });
                        values.push(Value::Null);
                    }
                },
            }
        }
        Column::from_values(column.name(), target, &values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected() -> TableSchema {
        TableSchema::new()
            .with_field("id", LogicalType::Integer64)
            .with_field("email", LogicalType::Utf8Text)
            .with_field("score", LogicalType::Float64)
    }

    #[test]
    fn test_missing_columns_fail_first() {
        let table = Table::builder()
            .column(Column::utf8("id", [Some("1")]))
            .column(Column::int64("extra", [Some(1)]))
            .build()
            .unwrap();
        let result = SchemaValidator::new(expected()).validate(&table);
        assert!(!result.passed);
        assert_eq!(result.message, "Missing columns: email, score");
        assert_eq!(result.extra_columns, vec!["extra"]);
    }

    #[test]
    fn test_first_type_mismatch_reported() {
        let table = Table::builder()
            .column(Column::float64("score", [Some(1.0)]))
            .column(Column::int64("email", [Some(1)]))
            .column(Column::utf8("id", [Some("1")]))
            .build()
            .unwrap();
        let result = SchemaValidator::new(expected()).validate(&table);
        assert!(!result.passed);
        assert_eq!(result.message, "id expected Integer64 got Utf8Text");
    }

    #[test]
    fn test_coercion_nulls_failed_cells() {
        let table = Table::builder()
            .column(Column::utf8("id", [Some("123"), Some("abc"), None]))
            .column(Column::utf8("email", [Some("a"), Some("b"), Some("c")]))
            .column(Column::int64("score", [Some(1), Some(2), Some(3)]))
            .build()
            .unwrap();
        let validator = SchemaValidator::new(expected());
        let (coerced, report) = validator.coerce_types_with_report(&table).unwrap();

        assert_eq!(report.coerced_columns, vec!["id", "score"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].row, 1);
        assert_eq!(report.failures[0].value, Value::from("abc"));

        let id = coerced.column("id").unwrap();
        assert_eq!(id.logical_type(), LogicalType::Integer64);
        assert_eq!(id.value(0), Value::Int(123));
        assert_eq!(id.value(1), Value::Null);
        assert_eq!(coerced.column("score").unwrap().value(2), Value::Float(3.0));
        assert!(validator.validate(&coerced).passed);

        // input untouched
        assert_eq!(
            table.column("id").unwrap().logical_type(),
            LogicalType::Utf8Text
        );
    }

    #[test]
    fn test_strict_coercion_aborts() {
        let table = Table::builder()
            .column(Column::utf8("id", [Some("1"), Some("x")]))
            .build()
            .unwrap();
        let err = SchemaValidator::new(expected())
            .with_policy(CoercionPolicy::Strict)
            .coerce_types(&table)
            .unwrap_err();
        match err {
            EtlError::Coercion { column, row, .. } => {
                assert_eq!(column, "id");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_coerce_raw_orders() {
        let raw = crate::test_fixtures::raw_orders().unwrap();
        let validator = SchemaValidator::new(
            TableSchema::new()
                .with_field("order_id", LogicalType::Integer64)
                .with_field("amount", LogicalType::Float64)
                .with_field("shipped", LogicalType::Boolean)
                .with_field("ordered_on", LogicalType::Date),
        );
        let (typed, report) = validator.coerce_types_with_report(&raw).unwrap();

        assert!(validator.validate(&typed).passed);
        let failed: Vec<(&str, usize)> = report
            .failures
            .iter()
            .map(|f| (f.column.as_str(), f.row))
            .collect();
        assert_eq!(failed, vec![("amount", 2), ("ordered_on", 2)]);
        assert_eq!(
            typed.row(2),
            vec![Value::Int(3), Value::Null, Value::Boolean(true), Value::Null]
        );
    }
}

