//! Vetting of user supplied regular expressions.
//!
//! Regex rules arrive as plain configuration data, so patterns are checked
//! before compilation: bounded length, no NUL bytes, no obviously nested
//! quantifiers, and a bounded compiled program size.

use crate::error::{EtlError, Result};
use moka::sync::Cache;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Maximum accepted pattern length in bytes.
pub const MAX_PATTERN_LENGTH: usize = 1000;

/// Upper bound on the compiled program size of a rule pattern.
const COMPILED_SIZE_LIMIT: usize = 1 << 20;

/// Maximum number of compiled patterns kept in the shared cache.
pub const MAX_CACHED_PATTERNS: u64 = 256;

/// Compiled patterns, shared across validators and runs. Bounded; the least
/// useful entries are evicted once the cap is reached.
static PATTERN_CACHE: Lazy<Cache<String, Regex>> =
    Lazy::new(|| Cache::new(MAX_CACHED_PATTERNS));

/// Validation and compilation of rule patterns.
pub struct PatternSecurity;

impl PatternSecurity {
    /// Validates a regex pattern for safety without compiling it.
    ///
    /// # Examples
    /// ```rust
    /// use etl_guard::security::PatternSecurity;
    ///
    /// assert!(PatternSecurity::validate_regex_pattern(r"^[^@]+@[^@]+$").is_ok());
    /// assert!(PatternSecurity::validate_regex_pattern("(.*)*").is_err());
    /// assert!(PatternSecurity::validate_regex_pattern(&"a".repeat(2000)).is_err());
    /// ```
    pub fn validate_regex_pattern(pattern: &str) -> Result<()> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(EtlError::SecurityError(format!(
                "Regex pattern too long (max {MAX_PATTERN_LENGTH} characters)"
            )));
        }

        if pattern.contains('\0') {
            return Err(EtlError::SecurityError(
                "Regex pattern cannot contain null bytes".to_string(),
            ));
        }

        Self::check_nested_quantifiers(pattern)
    }

    /// Validates and compiles a pattern. Compiled patterns are cached, so
    /// re-running a rule set does not recompile its regexes.
    pub fn compile(pattern: &str) -> Result<Regex> {
        if let Some(regex) = PATTERN_CACHE.get(pattern) {
            return Ok(regex);
        }

        Self::validate_regex_pattern(pattern)?;
        let regex = RegexBuilder::new(pattern)
            .size_limit(COMPILED_SIZE_LIMIT)
            .build()
            .map_err(|e| EtlError::SecurityError(format!("Invalid regex pattern: {e}")))?;

        PATTERN_CACHE.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    fn check_nested_quantifiers(pattern: &str) -> Result<()> {
        const NESTED: &[&str] = &["(.*)*", "(.*)+", "(.+)*", "(.+)+", "(a+)+", "(a*)*"];

        if NESTED.iter().any(|dangerous| pattern.contains(dangerous)) {
            return Err(EtlError::SecurityError(
                "Regex pattern contains nested quantifiers".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiles_common_patterns() {
        for pattern in [r"^[^@]+@[^@]+\.[a-z]+$", r"\d{3}-\d{4}", "^(active|inactive)$"] {
            assert!(PatternSecurity::compile(pattern).is_ok(), "{pattern}");
        }
    }

    #[test]
    fn test_rejects_invalid_syntax() {
        let err = PatternSecurity::compile("([a-z]").unwrap_err();
        assert!(err.to_string().contains("Invalid regex pattern"));
    }

    #[test]
    fn test_cached_compile_matches_fresh() {
        let first = PatternSecurity::compile("^id-[0-9]+$").unwrap();
        let second = PatternSecurity::compile("^id-[0-9]+$").unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert!(second.is_match("id-42"));
    }

    #[test]
    fn test_pattern_cache_is_bounded() {
        let extra = MAX_CACHED_PATTERNS as usize + 64;
        for i in 0..extra {
            let regex = PatternSecurity::compile(&format!("^bounded-{i}$")).unwrap();
            assert!(regex.is_match(&format!("bounded-{i}")));
        }
        PATTERN_CACHE.run_pending_tasks();
        assert!(PATTERN_CACHE.entry_count() <= MAX_CACHED_PATTERNS);

        // Evicted patterns still compile on demand.
        assert!(PatternSecurity::compile("^bounded-0$").unwrap().is_match("bounded-0"));
    }

    #[test]
    fn test_rejects_null_bytes() {
        assert!(PatternSecurity::validate_regex_pattern("abc\0").is_err());
    }
}
