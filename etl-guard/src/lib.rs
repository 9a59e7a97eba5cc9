//! # etl-guard - Data validation and table diffs for ETL testing
//!
//! etl-guard checks the data an ETL pipeline produces. It evaluates
//! declarative rules against in-memory columnar tables, verifies and coerces
//! table schemas, classifies schema evolution as backward compatible or
//! breaking, and computes key-based row diffs between a source and a target
//! table. Tables are backed by Apache Arrow arrays and everything runs
//! synchronously in memory.
//!
//! ## Quick Start
//!
//! ```rust
//! use etl_guard::prelude::*;
//!
//! # fn example() -> etl_guard::error::Result<()> {
//! let table = Table::builder()
//!     .column(Column::int64("id", [Some(1), Some(2), Some(3)]))
//!     .column(Column::utf8("email", [Some("a@x.com"), None, Some("c@x.com")]))
//!     .column(Column::int64("age", [Some(25), Some(30), Some(200)]))
//!     .build()?;
//!
//! let validator = Validator::builder()
//!     .level(Level::Error)
//!     .not_null("id")
//!     .unique("id")
//!     .level(Level::Warning)
//!     .matches_or_null("email", r"^[^@]+@[^@]+$")
//!     .range("age", 0.0, 150.0)
//!     .build();
//!
//! let report = validator.validate_report(&table);
//! assert!(!report.has_errors());
//! assert!(report.has_warnings());
//! for failure in report.failures() {
//!     println!("{}: {}", failure.rule_name, failure.message);
//! }
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Comparing tables
//!
//! ```rust
//! use etl_guard::prelude::*;
//!
//! # fn example() -> etl_guard::error::Result<()> {
//! let source = Table::builder()
//!     .column(Column::int64("id", [Some(1), Some(2)]))
//!     .column(Column::utf8("email", [Some("a@x.com"), Some("b@x.com")]))
//!     .build()?;
//! let target = Table::builder()
//!     .column(Column::int64("id", [Some(1), Some(3)]))
//!     .column(Column::utf8("email", [Some("a@x.com"), Some("c@x.com")]))
//!     .build()?;
//!
//! let diff = DataComparator::new().compare(&source, &target, &["id"], None, None)?;
//! assert_eq!(diff.added_rows.row_count(), 1);
//! assert_eq!(diff.removed_rows.row_count(), 1);
//! assert_eq!(diff.unchanged_count, 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Architecture
//!
//! - **`table`**: immutable columnar tables, logical types, values and casts
//! - **`core`**: validation rules, the `Validator` and its results
//! - **`schema`**: expected-schema validation, coercion and compatibility
//! - **`diff`**: the hash-join `DataComparator`
//! - **`logging`**: `tracing` configuration and subscriber setup
//! - **`security`**: vetting of user supplied regex patterns

pub mod core;
pub mod diff;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod schema;
pub mod security;
pub mod table;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
