//! Integration tests for schema validation, coercion and compatibility.

use chrono::NaiveDate;
use etl_guard::error::EtlError;
use etl_guard::schema::{
    CoercionPolicy, CompatibilityMatrix, SchemaComparator, SchemaValidator,
};
use etl_guard::table::{Column, LogicalType, Table, TableSchema, Value};

fn expected() -> TableSchema {
    TableSchema::new()
        .with_field("id", LogicalType::Integer64)
        .with_field("price", LogicalType::Float64)
        .with_field("in_stock", LogicalType::Boolean)
        .with_field("listed", LogicalType::Date)
}

fn raw() -> Table {
    Table::builder()
        .column(Column::utf8("id", [Some("1"), Some(" 2 "), Some("three")]))
        .column(Column::utf8("price", [Some("9.5"), Some("1e2"), None]))
        .column(Column::utf8("in_stock", [Some("yes"), Some("FALSE"), Some("maybe")]))
        .column(Column::utf8(
            "listed",
            [Some("2024-05-01"), Some("2024-13-01"), Some("2024-05-03")],
        ))
        .column(Column::utf8("comment", [Some("x"), None, Some("z")]))
        .build()
        .unwrap()
}

#[test]
fn test_validate_reports_missing_then_mismatch() {
    let validator = SchemaValidator::new(expected());

    let partial = raw().select(&["price", "id"]).unwrap();
    let result = validator.validate(&partial);
    assert!(!result.passed);
    assert_eq!(result.message, "Missing columns: in_stock, listed");

    let result = validator.validate(&raw());
    assert!(!result.passed);
    assert_eq!(result.message, "id expected Integer64 got Utf8Text");
    assert_eq!(result.extra_columns, vec!["comment"]);
}

#[test]
fn test_coercion_round_trip() {
    let validator = SchemaValidator::new(expected());
    let input = raw();
    let (typed, report) = validator.coerce_types_with_report(&input).unwrap();

    assert!(validator.validate(&typed).passed);
    assert_eq!(report.coerced_columns, vec!["id", "price", "in_stock", "listed"]);
    assert_eq!(report.failures.len(), 3);
    assert!(!report.is_lossless());

    assert_eq!(
        typed.row(0),
        vec![
            Value::Int(1),
            Value::Float(9.5),
            Value::Boolean(true),
            Value::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            Value::from("x"),
        ]
    );
    assert_eq!(typed.row(1)[..3], [Value::Int(2), Value::Float(100.0), Value::Boolean(false)]);
    assert_eq!(typed.row(1)[3], Value::Null);
    assert_eq!(typed.row(2)[0], Value::Null);

    // already-typed tables are left as they are
    let (again, report) = validator.coerce_types_with_report(&typed).unwrap();
    assert!(report.coerced_columns.is_empty());
    assert_eq!(again.rows().collect::<Vec<_>>(), typed.rows().collect::<Vec<_>>());

    assert_eq!(input.schema().get("id"), Some(LogicalType::Utf8Text));
}

#[test]
fn test_strict_coercion() {
    let err = SchemaValidator::new(expected())
        .with_policy(CoercionPolicy::Strict)
        .coerce_types(&raw())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot cast value 'three' in column 'id' (row 2) to Integer64"
    );
    assert!(matches!(err, EtlError::Coercion { .. }));
}

#[test]
fn test_expected_schema_from_json() {
    let schema: TableSchema = serde_json::from_str(
        r#"[{"name": "id", "type": "Integer64"}, {"name": "price", "type": "Float64"}]"#,
    )
    .unwrap();
    let table = Table::builder()
        .column(Column::int64("id", [Some(1)]))
        .column(Column::float64("price", [Some(2.0)]))
        .build()
        .unwrap();
    assert!(SchemaValidator::new(schema).validate(&table).passed);
}

#[test]
fn test_schema_evolution() {
    let v1 = TableSchema::new()
        .with_field("id", LogicalType::Integer32)
        .with_field("amount", LogicalType::Float32)
        .with_field("code", LogicalType::Integer64)
        .with_field("legacy", LogicalType::Utf8Text);
    let v2 = TableSchema::new()
        .with_field("id", LogicalType::Integer64)
        .with_field("amount", LogicalType::Float64)
        .with_field("code", LogicalType::Utf8Text)
        .with_field("created", LogicalType::Date);

    let report = SchemaComparator::new().compare(&v1, &v2);
    assert!(!report.is_backward_compatible);
    assert_eq!(
        report.breaking_changes,
        vec![
            "Column 'legacy' was removed",
            "Column 'code' changed type from Integer64 to Utf8Text",
        ]
    );
    assert_eq!(report.added_columns, vec!["created"]);
    assert!(report.type_change("id").unwrap().is_compatible);
    assert!(report.type_change("amount").unwrap().is_compatible);

    let lenient = SchemaComparator::with_matrix(
        CompatibilityMatrix::widening().allow(LogicalType::Integer64, LogicalType::Utf8Text),
    );
    let report = lenient.compare(&v1, &v2);
    assert_eq!(report.breaking_changes, vec!["Column 'legacy' was removed"]);

    assert!(SchemaComparator::new().compare(&v2, &v2).is_backward_compatible);
}

#[test]
fn test_compare_tables() {
    let old = Table::builder()
        .column(Column::int32("qty", [Some(1)]))
        .build()
        .unwrap();
    let new = Table::builder()
        .column(Column::float64("qty", [Some(1.0)]))
        .column(Column::utf8("unit", [Some("kg")]))
        .build()
        .unwrap();
    let comparator = SchemaComparator::new();
    assert!(comparator.compare_tables(&old, &new).is_backward_compatible);
    assert!(!comparator.compare_tables(&new, &old).is_backward_compatible);
}
