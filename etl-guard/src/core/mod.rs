//! Rule-based table validation.
//!
//! A [`Validator`] holds an ordered list of [`ValidationRule`]s, each
//! registered with a severity [`Level`], and evaluates them against a
//! [`Table`](crate::table::Table). Every rule produces exactly one
//! [`ValidationResult`]; failing data is a result, never an error.

mod level;
mod result;
mod rule;
mod validator;

pub use level::Level;
pub use result::{FindingKind, ResultMetadata, ValidationMetrics, ValidationReport, ValidationResult};
pub use rule::ValidationRule;
pub use validator::{RegisteredRule, Validator, ValidatorBuilder, ValidatorConfig};
