//! Validation result types.

use super::{Level, ValidationRule};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a failed result is a data finding or a broken rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// The rule was evaluated against the data.
    #[default]
    Data,
    /// The rule could not be evaluated (missing column, wrong type, bad pattern).
    Configuration,
}

/// Metadata attached to every [`ValidationResult`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Number of violations found; the unit depends on the rule
    /// (rows for most rules, duplicate groups for uniqueness).
    pub violation_count: usize,
    /// Ascending indices of violating rows, capped by the sample limit
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sample_rows: Vec<usize>,
    pub kind: FindingKind,
    /// Rule-specific extras such as observed row counts
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub details: BTreeMap<String, String>,
}

impl ResultMetadata {
    pub fn violations(count: usize, sample_rows: Vec<usize>) -> Self {
        Self {
            violation_count: count,
            sample_rows,
            kind: FindingKind::Data,
            details: BTreeMap::new(),
        }
    }

    pub fn configuration() -> Self {
        Self {
            kind: FindingKind::Configuration,
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }
}

/// The outcome of evaluating one registered rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Stable identity of the rule, e.g. `not_null(email)`
    pub rule_name: String,
    pub rule: ValidationRule,
    pub level: Level,
    pub passed: bool,
    pub message: String,
    pub metadata: ResultMetadata,
}

impl ValidationResult {
    pub(crate) fn new(
        rule: &ValidationRule,
        level: Level,
        passed: bool,
        message: impl Into<String>,
        metadata: ResultMetadata,
    ) -> Self {
        Self {
            rule_name: rule.name(),
            rule: rule.clone(),
            level,
            passed,
            message: message.into(),
            metadata,
        }
    }

    pub fn violation_count(&self) -> usize {
        self.metadata.violation_count
    }

    /// True when the rule failed because it could not be evaluated.
    pub fn is_configuration_error(&self) -> bool {
        !self.passed && self.metadata.kind == FindingKind::Configuration
    }
}

/// Counts over one validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub total_rules: usize,
    pub passed_rules: usize,
    pub failed_rules: usize,
    /// Failed rules that are configuration errors (subset of `failed_rules`)
    pub configuration_errors: usize,
}

impl ValidationMetrics {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let passed_rules = results.iter().filter(|r| r.passed).count();
        Self {
            total_rules: results.len(),
            passed_rules,
            failed_rules: results.len() - passed_rules,
            configuration_errors: results.iter().filter(|r| r.is_configuration_error()).count(),
        }
    }

    /// Returns the success rate as a percentage (0.0 to 100.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_rules == 0 {
            100.0
        } else {
            (self.passed_rules as f64 / self.total_rules as f64) * 100.0
        }
    }
}

/// Results of a validation run together with summary metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub row_count: usize,
    pub metrics: ValidationMetrics,
    /// One result per registered rule, in registration order
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new(row_count: usize, results: Vec<ValidationResult>) -> Self {
        Self {
            row_count,
            metrics: ValidationMetrics::from_results(&results),
            results,
        }
    }

    pub fn passed(&self) -> bool {
        self.metrics.failed_rules == 0
    }

    /// Returns true if any Error-level rule failed.
    pub fn has_errors(&self) -> bool {
        self.failures().any(|r| r.level == Level::Error)
    }

    /// Returns true if any Warning-level rule failed.
    pub fn has_warnings(&self) -> bool {
        self.failures().any(|r| r.level == Level::Warning)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    pub fn failures_at_least(&self, level: Level) -> Vec<&ValidationResult> {
        self.failures()
            .filter(|r| r.level.is_at_least(level))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(passed: bool, level: Level, metadata: ResultMetadata) -> ValidationResult {
        ValidationResult::new(
            &ValidationRule::not_null("id"),
            level,
            passed,
            "msg",
            metadata,
        )
    }

    #[test]
    fn test_metrics_and_levels() {
        let report = ValidationReport::new(
            10,
            vec![
                result(true, Level::Error, ResultMetadata::default()),
                result(false, Level::Warning, ResultMetadata::violations(2, vec![1, 4])),
                result(false, Level::Info, ResultMetadata::configuration()),
            ],
        );
        assert_eq!(report.metrics.total_rules, 3);
        assert_eq!(report.metrics.failed_rules, 2);
        assert_eq!(report.metrics.configuration_errors, 1);
        assert!((report.metrics.success_rate() - 100.0 / 3.0).abs() < 1e-9);
        assert!(!report.has_errors());
        assert!(report.has_warnings());
        assert_eq!(report.failures_at_least(Level::Warning).len(), 1);
    }

    #[test]
    fn test_result_json_shape() {
        let r = result(
            false,
            Level::Error,
            ResultMetadata::violations(1, vec![3]).with_detail("null_count", 1),
        );
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["rule_name"], "not_null(id)");
        assert_eq!(json["rule"]["type"], "not_null");
        assert_eq!(json["metadata"]["sample_rows"][0], 3);
        assert_eq!(json["metadata"]["kind"], "data");
        assert_eq!(json["metadata"]["details"]["null_count"], "1");
    }
}
