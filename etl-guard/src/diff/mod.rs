//! Key-based comparison of two tables.
//!
//! [`DataComparator`] matches source and target rows on key columns with hash
//! joins and classifies every row as added, removed, modified or unchanged.
//! Schema-level differences are reported separately by
//! [`DataComparator::compare_schemas`].

mod comparator;
pub(crate) mod keys;
mod result;

pub use comparator::{DataComparator, DiffConfig, DuplicateKeyPolicy};
pub use result::{DiffResult, DiffSummary, TARGET_SUFFIX};
