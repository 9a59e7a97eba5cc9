//! Declarative validation rules and their evaluation.
//!
//! Null handling differs per rule and is deliberate:
//!
//! | rule        | null cells                                   |
//! |-------------|----------------------------------------------|
//! | `not_null`  | violations                                   |
//! | `unique`    | ignored, never collide with each other       |
//! | `regex`     | violations unless `allow_nulls` is set       |
//! | `range`     | ignored                                      |
//! | `enum`      | violations                                   |
//!
//! A rule that cannot be evaluated against a table (missing column, wrong
//! column type, unusable pattern) yields a failed result of kind
//! [`FindingKind::Configuration`](super::FindingKind) instead of an error.

use super::{Level, ResultMetadata, ValidationResult};
use crate::diff::keys::KeyEncoder;
use crate::security::PatternSecurity;
use crate::table::{cast_value, Column, LogicalType, Table, Value};
use arrow::array::AsArray;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A single declarative expectation about a table.
///
/// Rules are plain data; they deserialize from JSON such as
/// `{"type": "range", "column": "age", "min": 0, "max": 150}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    NotNull {
        column: String,
    },
    Unique {
        column: String,
    },
    Regex {
        column: String,
        pattern: String,
        #[serde(default)]
        allow_nulls: bool,
    },
    Range {
        column: String,
        min: f64,
        max: f64,
    },
    Enum {
        column: String,
        allowed: Vec<Value>,
    },
    RowCountGreaterThan {
        n: usize,
    },
    ColumnExists {
        column: String,
    },
}

impl ValidationRule {
    pub fn not_null(column: impl Into<String>) -> Self {
        Self::NotNull {
            column: column.into(),
        }
    }

    pub fn unique(column: impl Into<String>) -> Self {
        Self::Unique {
            column: column.into(),
        }
    }

    pub fn regex(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Regex {
            column: column.into(),
            pattern: pattern.into(),
            allow_nulls: false,
        }
    }

    pub fn range(column: impl Into<String>, min: f64, max: f64) -> Self {
        Self::Range {
            column: column.into(),
            min,
            max,
        }
    }

    pub fn one_of<V: Into<Value>>(
        column: impl Into<String>,
        allowed: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Enum {
            column: column.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn row_count_greater_than(n: usize) -> Self {
        Self::RowCountGreaterThan { n }
    }

    pub fn column_exists(column: impl Into<String>) -> Self {
        Self::ColumnExists {
            column: column.into(),
        }
    }

    /// Stable identity used in results and logs.
    pub fn name(&self) -> String {
        match self {
            Self::NotNull { column } => format!("not_null({column})"),
            Self::Unique { column } => format!("unique({column})"),
            Self::Regex {
                column, pattern, ..
            } => format!("regex({column}, {pattern})"),
            Self::Range { column, min, max } => format!("range({column}, {min}, {max})"),
            Self::Enum { column, .. } => format!("enum({column})"),
            Self::RowCountGreaterThan { n } => format!("row_count_greater_than({n})"),
            Self::ColumnExists { column } => format!("column_exists({column})"),
        }
    }

    /// The column this rule inspects, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::NotNull { column }
            | Self::Unique { column }
            | Self::Regex { column, .. }
            | Self::Range { column, .. }
            | Self::Enum { column, .. }
            | Self::ColumnExists { column } => Some(column),
            Self::RowCountGreaterThan { .. } => None,
        }
    }

    /// Evaluates the rule. Never fails: problems with the rule itself are
    /// reported as configuration findings.
    pub(crate) fn evaluate(
        &self,
        table: &Table,
        level: Level,
        sample_limit: usize,
    ) -> ValidationResult {
        let ctx = EvalContext {
            rule: self,
            level,
            sample_limit,
        };
        match self {
            Self::RowCountGreaterThan { n } => {
                let rows = table.row_count();
                let passed = rows > *n;
                let message = if passed {
                    format!("row count {rows} is greater than {n}")
                } else {
                    format!("row count {rows} is not greater than {n}")
                };
                let metadata =
                    ResultMetadata::violations(0, Vec::new()).with_detail("row_count", rows);
                ctx.finish(passed, message, metadata)
            }
            Self::ColumnExists { column } => match table.column(column) {
                Some(col) => ctx.finish(
                    true,
                    format!("column '{column}' exists"),
                    ResultMetadata::default().with_detail("type", col.logical_type()),
                ),
                None => ctx.finish(
                    false,
                    format!("column '{column}' does not exist"),
                    ResultMetadata::violations(1, Vec::new()),
                ),
            },
            Self::NotNull { column } => ctx.with_column(table, column, |col| ctx.not_null(col)),
            Self::Unique { column } => ctx.with_column(table, column, |col| ctx.unique(col)),
            Self::Regex {
                column,
                pattern,
                allow_nulls,
            } => ctx.with_column(table, column, |col| ctx.regex(col, pattern, *allow_nulls)),
            Self::Range { column, min, max } => {
                ctx.with_column(table, column, |col| ctx.range(col, *min, *max))
            }
            Self::Enum { column, allowed } => {
                ctx.with_column(table, column, |col| ctx.one_of(col, allowed))
            }
        }
    }
}

/// Violation counter that keeps the first few row indices.
struct Violations {
    count: usize,
    samples: Vec<usize>,
    limit: usize,
}

impl Violations {
    fn new(limit: usize) -> Self {
        Self {
            count: 0,
            samples: Vec::new(),
            limit,
        }
    }

    fn record(&mut self, row: usize) {
        self.count += 1;
        if self.samples.len() < self.limit {
            self.samples.push(row);
        }
    }

    fn into_metadata(self) -> ResultMetadata {
        ResultMetadata::violations(self.count, self.samples)
    }
}

struct EvalContext<'r> {
    rule: &'r ValidationRule,
    level: Level,
    sample_limit: usize,
}

impl EvalContext<'_> {
    fn finish(&self, passed: bool, message: String, metadata: ResultMetadata) -> ValidationResult {
        ValidationResult::new(self.rule, self.level, passed, message, metadata)
    }

    fn config_error(&self, message: impl Into<String>) -> ValidationResult {
        ValidationResult::new(
            self.rule,
            self.level,
            false,
            message,
            ResultMetadata::configuration(),
        )
    }

    fn with_column(
        &self,
        table: &Table,
        column: &str,
        eval: impl FnOnce(&Column) -> ValidationResult,
    ) -> ValidationResult {
        match table.column(column) {
            Some(col) => eval(col),
            None => self.config_error(format!("column '{column}' not found in table")),
        }
    }

    fn not_null(&self, col: &Column) -> ValidationResult {
        let mut violations = Violations::new(self.sample_limit);
        if col.null_count() > 0 {
            (0..col.len())
                .filter(|&row| col.is_null(row))
                .for_each(|row| violations.record(row));
        }
        let count = violations.count;
        let message = if count == 0 {
            format!("column '{}' has no null values", col.name())
        } else {
            format!("column '{}' has {count} null values", col.name())
        };
        self.finish(count == 0, message, violations.into_metadata())
    }

    fn unique(&self, col: &Column) -> ValidationResult {
        let encoded = KeyEncoder::new(&[col.logical_type()]).and_then(|enc| enc.encode(&[col]));
        let rows = match encoded {
            Ok(rows) => rows,
            Err(e) => {
                return self.config_error(format!("cannot group column '{}': {e}", col.name()))
            }
        };

        // occurrences per value, nulls excluded
        let mut groups: HashMap<_, usize> = HashMap::new();
        let mut duplicate_rows = Violations::new(self.sample_limit);
        for row in 0..col.len() {
            if col.is_null(row) {
                continue;
            }
            let seen = groups.entry(rows.row(row)).or_insert(0);
            *seen += 1;
            if *seen > 1 {
                duplicate_rows.record(row);
            }
        }
        let duplicate_groups = groups.values().filter(|&&n| n > 1).count();

        let message = if duplicate_groups == 0 {
            format!("column '{}' values are unique", col.name())
        } else {
            format!(
                "column '{}' has {duplicate_groups} duplicated values across {} extra rows",
                col.name(),
                duplicate_rows.count
            )
        };
        let extra_rows = duplicate_rows.count;
        let mut metadata = duplicate_rows.into_metadata();
        metadata.violation_count = duplicate_groups;
        self.finish(
            duplicate_groups == 0,
            message,
            metadata.with_detail("duplicate_rows", extra_rows),
        )
    }

    fn regex(&self, col: &Column, pattern: &str, allow_nulls: bool) -> ValidationResult {
        if col.logical_type() != LogicalType::Utf8Text {
            return self.config_error(format!(
                "column '{}' has type {}; regex checks require {}",
                col.name(),
                col.logical_type(),
                LogicalType::Utf8Text
            ));
        }
        let regex = match PatternSecurity::compile(pattern) {
            Ok(regex) => regex,
            Err(e) => return self.config_error(e.to_string()),
        };

        let strings = col.values().as_string::<i32>();
        let mut violations = Violations::new(self.sample_limit);
        for row in 0..col.len() {
            if col.is_null(row) {
                if !allow_nulls {
                    violations.record(row);
                }
            } else if !regex.is_match(strings.value(row)) {
                violations.record(row);
            }
        }
        let count = violations.count;
        let message = if count == 0 {
            format!("all values of '{}' match '{pattern}'", col.name())
        } else {
            format!("{count} values of '{}' do not match '{pattern}'", col.name())
        };
        self.finish(count == 0, message, violations.into_metadata())
    }

    fn range(&self, col: &Column, min: f64, max: f64) -> ValidationResult {
        if !col.logical_type().is_numeric() {
            return self.config_error(format!(
                "column '{}' has type {}; range checks require a numeric column",
                col.name(),
                col.logical_type()
            ));
        }
        if min.is_nan() || max.is_nan() || min > max {
            return self.config_error(format!("invalid range [{min}, {max}]"));
        }

        let mut violations = Violations::new(self.sample_limit);
        for row in 0..col.len() {
            let within = match col.value(row) {
                Value::Int(v) => int_within(v, min, max),
                // NaN is outside every range
                Value::Float(v) => (min..=max).contains(&v),
                _ => true,
            };
            if !within {
                violations.record(row);
            }
        }
        let count = violations.count;
        let message = if count == 0 {
            format!("all values of '{}' are within [{min}, {max}]", col.name())
        } else {
            format!("{count} values of '{}' are outside [{min}, {max}]", col.name())
        };
        self.finish(count == 0, message, violations.into_metadata())
    }

    fn one_of(&self, col: &Column, allowed: &[Value]) -> ValidationResult {
        let allowed: HashSet<Value> = allowed
            .iter()
            .filter_map(|v| match cast_value(v, col.logical_type()) {
                Ok(cast) if !cast.is_null() => Some(cast),
                Ok(_) => None,
                Err(e) => {
                    debug!(rule = %self.rule.name(), error = %e, "Allowed value never matches column type");
                    None
                }
            })
            .collect();

        let mut violations = Violations::new(self.sample_limit);
        for row in 0..col.len() {
            let value = col.value(row);
            if value.is_null() || !allowed.contains(&value) {
                violations.record(row);
            }
        }
        let count = violations.count;
        let message = if count == 0 {
            format!("all values of '{}' are in the allowed set", col.name())
        } else {
            format!("{count} values of '{}' are not in the allowed set", col.name())
        };
        self.finish(count == 0, message, violations.into_metadata())
    }
}

/// Exact `min <= v <= max` for an integer against float bounds. Widening `v`
/// to f64 would round values beyond 2^53.
fn int_within(v: i64, min: f64, max: f64) -> bool {
    // 2^63, one past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let above_min = if min >= LIMIT {
        false
    } else if min <= -LIMIT {
        true
    } else {
        v >= min.ceil() as i64
    };
    let below_max = if max >= LIMIT {
        true
    } else if max < -LIMIT {
        false
    } else {
        v <= max.floor() as i64
    };
    above_min && below_max
}
