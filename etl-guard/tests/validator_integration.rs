//! Integration tests for the rule validator.

use etl_guard::core::{FindingKind, Level, ValidationRule, Validator, ValidatorConfig};
use etl_guard::table::{Column, Table, Value};

fn people() -> Table {
    Table::builder()
        .column(Column::int64("id", [Some(1), Some(2), Some(3)]))
        .column(Column::int64("age", [Some(25), Some(30), Some(200)]))
        .column(Column::utf8(
            "email",
            [Some("a@example.com"), Some("b@example.com"), None],
        ))
        .column(Column::utf8("status", [Some("active"), Some("gone"), None]))
        .build()
        .unwrap()
}

#[test]
fn test_age_range_scenario() {
    let mut validator = Validator::new();
    validator.register(ValidationRule::range("age", 0.0, 150.0));

    let results = validator.validate(&people());
    assert_eq!(results.len(), 1);
    assert!(!results[0].passed);
    assert_eq!(results[0].violation_count(), 1);
    assert_eq!(results[0].metadata.sample_rows, vec![2]);
}

#[test]
fn test_full_rule_set() {
    let validator = Validator::builder()
        .row_count_greater_than(0)
        .column_exists("id")
        .not_null("id")
        .unique("id")
        .not_null("email")
        .matches("email", r"^[^@]+@[^@]+\.[a-z]+$")
        .matches_or_null("email", r"@example\.com$")
        .one_of("status", ["active", "inactive"])
        .build();

    let results = validator.validate(&people());
    let passed: Vec<bool> = results.iter().map(|r| r.passed).collect();
    assert_eq!(
        passed,
        vec![true, true, true, true, false, false, true, false]
    );
    // gone + null
    assert_eq!(results[7].violation_count(), 2);
}

#[test]
fn test_misconfigured_rules_fail_without_panicking() {
    let validator = Validator::builder()
        .not_null("missing")
        .matches("age", "^[0-9]+$")
        .matches("email", "(.*)*")
        .range("age", 10.0, 1.0)
        .build();

    let results = validator.validate(&people());
    assert_eq!(results.len(), 4);
    for result in &results {
        assert!(!result.passed, "{}", result.rule_name);
        assert_eq!(result.metadata.kind, FindingKind::Configuration);
    }

    let report = validator.validate_report(&people());
    assert_eq!(report.metrics.configuration_errors, 4);
    assert!(report.has_errors());
}

#[test]
fn test_validation_never_mutates_table() {
    let table = people();
    let before: Vec<Vec<Value>> = table.rows().collect();
    let validator = Validator::builder().unique("id").range("age", 0.0, 10.0).build();

    let first = validator.validate(&table);
    let second = validator.validate(&table);
    assert_eq!(first, second);
    assert_eq!(table.rows().collect::<Vec<_>>(), before);
}

#[test]
fn test_rules_from_json_config() {
    let validator = Validator::from_json(
        r#"[
            {"type": "column_exists", "column": "status"},
            {"type": "enum", "column": "status", "allowed": ["active", "gone"], "level": "warning"},
            {"type": "range", "column": "age", "min": 0, "max": 150, "level": "info"}
        ]"#,
    )
    .unwrap();

    let report = validator.validate_report(&people());
    assert!(!report.has_errors());
    assert_eq!(report.failures_at_least(Level::Warning).len(), 1);
    assert_eq!(report.failures().count(), 2);

    let json = report.to_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["results"].as_array().unwrap().len(), 3);
}

#[test]
fn test_sample_rows_are_capped() {
    let ages: Vec<Option<i64>> = (0..100).map(|i| Some(i * 10)).collect();
    let table = Table::builder()
        .column(Column::int64("age", ages))
        .build()
        .unwrap();
    let validator = Validator::builder()
        .config(ValidatorConfig::default().with_sample_limit(3))
        .range("age", 0.0, 150.0)
        .build();

    let result = &validator.validate(&table)[0];
    assert_eq!(result.violation_count(), 84);
    assert_eq!(result.metadata.sample_rows, vec![16, 17, 18]);
}
