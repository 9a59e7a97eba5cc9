//! Rule severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity of a validation rule.
///
/// Levels are ordered by severity: Error > Warning > Info. A failed
/// Error-level rule makes a [`ValidationReport`](super::ValidationReport)
/// report errors; lower levels are surfaced but do not.
///
/// ```rust
/// use etl_guard::core::Level;
///
/// assert!(Level::Error > Level::Warning);
/// assert!(Level::Warning > Level::Info);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Informational observations
    Info = 0,
    /// Issues worth reviewing that should not block a pipeline
    Warning = 1,
    /// Data quality failures that must be addressed
    #[default]
    Error = 2,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }

    /// Checks if this level is at least as severe as another level.
    pub fn is_at_least(&self, other: Level) -> bool {
        *self >= other
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
