//! The rule registry and its evaluation loop.

use super::{Level, ValidationReport, ValidationResult, ValidationRule};
use crate::error::Result;
use crate::logging::{truncate_field, LogConfig};
use crate::{log_rule, perf_debug};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Configuration for a [`Validator`].
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Maximum number of violating row indices kept per result
    pub sample_limit: usize,
    pub log: LogConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            sample_limit: 10,
            log: LogConfig::default(),
        }
    }
}

impl ValidatorConfig {
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

/// A rule together with the severity its failures carry.
///
/// Serializes flat: `{"type": "not_null", "column": "id", "level": "warning"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredRule {
    #[serde(flatten)]
    pub rule: ValidationRule,
    #[serde(default)]
    pub level: Level,
}

/// Evaluates a list of rules against tables.
///
/// `validate` is a pure function of the registered rules, the configuration
/// and the table: it never mutates the table and repeated calls return
/// identical results, one per rule in registration order.
///
/// # Examples
///
/// ```rust
/// use etl_guard::core::{Level, Validator};
/// use etl_guard::table::{Column, Table};
///
/// let validator = Validator::builder()
///     .not_null("id")
///     .unique("id")
///     .level(Level::Warning)
///     .range("age", 0.0, 150.0)
///     .build();
///
/// let table = Table::builder()
///     .column(Column::int64("id", [Some(1), Some(2), Some(3)]))
///     .column(Column::int64("age", [Some(25), Some(30), Some(200)]))
///     .build()
///     .unwrap();
///
/// let results = validator.validate(&table);
/// assert!(results[0].passed && results[1].passed);
/// assert_eq!(results[2].violation_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: Vec<RegisteredRule>,
    config: ValidatorConfig,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self {
            rules: Vec::new(),
            config,
        }
    }

    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    /// Loads rules from a JSON list of flat rule objects.
    pub fn from_json(json: &str) -> Result<Self> {
        let rules: Vec<RegisteredRule> = serde_json::from_str(json)?;
        Ok(Self {
            rules,
            config: ValidatorConfig::default(),
        })
    }

    /// Appends a rule at the default (Error) level. Rules are not deduplicated.
    pub fn register(&mut self, rule: ValidationRule) {
        self.register_with_level(rule, Level::default());
    }

    pub fn register_with_level(&mut self, rule: ValidationRule, level: Level) {
        self.rules.push(RegisteredRule { rule, level });
    }

    pub fn rules(&self) -> &[RegisteredRule] {
        &self.rules
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates every registered rule against `table`.
    #[instrument(skip(self, table), fields(rules = self.rules.len(), rows = table.row_count()))]
    pub fn validate(&self, table: &Table) -> Vec<ValidationResult> {
        let results: Vec<ValidationResult> = self
            .rules
            .iter()
            .map(|registered| {
                let result =
                    registered
                        .rule
                        .evaluate(table, registered.level, self.config.sample_limit);
                log_rule!(
                    self.config.log,
                    rule = %result.rule_name,
                    passed = result.passed,
                    violations = result.violation_count(),
                    "Rule evaluated"
                );
                if !result.passed {
                    perf_debug!(
                        self.config.log,
                        rule = %result.rule_name,
                        message = %truncate_field(&result.message, self.config.log.max_field_length),
                        "Rule failed"
                    );
                }
                result
            })
            .collect();

        let failed = results.iter().filter(|r| !r.passed).count();
        info!(
            total = results.len(),
            failed = failed,
            "Validation completed"
        );
        results
    }

    /// Evaluates all rules and wraps the results with summary metrics.
    pub fn validate_report(&self, table: &Table) -> ValidationReport {
        ValidationReport::new(table.row_count(), self.validate(table))
    }
}

/// Fluent builder producing an immutable [`Validator`].
///
/// `level` applies to every rule added after it.
#[derive(Debug, Default)]
pub struct ValidatorBuilder {
    rules: Vec<RegisteredRule>,
    config: ValidatorConfig,
    level: Level,
}

impl ValidatorBuilder {
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(RegisteredRule {
            rule,
            level: self.level,
        });
        self
    }

    pub fn not_null(self, column: impl Into<String>) -> Self {
        self.rule(ValidationRule::not_null(column))
    }

    pub fn unique(self, column: impl Into<String>) -> Self {
        self.rule(ValidationRule::unique(column))
    }

    /// Null values count as violations.
    pub fn matches(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.rule(ValidationRule::regex(column, pattern))
    }

    /// Like [`matches`](Self::matches) but null values pass.
    pub fn matches_or_null(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.rule(ValidationRule::Regex {
            column: column.into(),
            pattern: pattern.into(),
            allow_nulls: true,
        })
    }

    pub fn range(self, column: impl Into<String>, min: f64, max: f64) -> Self {
        self.rule(ValidationRule::range(column, min, max))
    }

    pub fn one_of<V: Into<crate::table::Value>>(
        self,
        column: impl Into<String>,
        allowed: impl IntoIterator<Item = V>,
    ) -> Self {
        self.rule(ValidationRule::one_of(column, allowed))
    }

    pub fn row_count_greater_than(self, n: usize) -> Self {
        self.rule(ValidationRule::row_count_greater_than(n))
    }

    pub fn column_exists(self, column: impl Into<String>) -> Self {
        self.rule(ValidationRule::column_exists(column))
    }

    pub fn build(self) -> Validator {
        Validator {
            rules: self.rules,
            config: self.config,
        }
    }
}
