//! Diff outcome types.

use crate::error::Result;
use crate::table::Table;
use serde::{Deserialize, Serialize};

/// Suffix appended to the target-side twin of each compared column in
/// [`DiffResult::modified_rows`].
pub const TARGET_SUFFIX: &str = "_target";

/// Row-level differences between a source and a target table.
///
/// `modified_rows` holds the key columns followed by a `col` / `col_target`
/// pair for every compared column, one row per differing source/target pair.
/// When `col_target` is itself a source column the suffix is repeated
/// (`col_target_target`); `target_columns` lists the names actually used.
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    /// Target rows whose key has no source counterpart, with all target columns
    pub added_rows: Table,
    /// Source rows whose key has no target counterpart, with all source columns
    pub removed_rows: Table,
    pub modified_rows: Table,
    /// Matched pairs that agree on every compared column
    pub unchanged_count: usize,
    pub key_columns: Vec<String>,
    pub compare_columns: Vec<String>,
    /// Target twin of each entry of `compare_columns` in `modified_rows`
    pub target_columns: Vec<String>,
}

impl DiffResult {
    pub fn has_differences(&self) -> bool {
        !self.added_rows.is_empty() || !self.removed_rows.is_empty() || !self.modified_rows.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            added: self.added_rows.row_count(),
            removed: self.removed_rows.row_count(),
            modified: self.modified_rows.row_count(),
            unchanged: self.unchanged_count,
            has_differences: self.has_differences(),
        }
    }

    /// Serializes the whole result, tables included, as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Row counts of a [`DiffResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub has_differences: bool,
}

impl std::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} modified, {} unchanged",
            self.added, self.removed, self.modified, self.unchanged
        )
    }
}
