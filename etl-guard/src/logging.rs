//! Logging utilities and configuration for etl-guard.
//!
//! The engine logs through `tracing`. [`LogConfig`] controls how chatty the
//! validator and comparator are; [`setup`] installs a `tracing-subscriber`
//! for binaries and tests that want output.

use tracing::Level;

/// Logging configuration carried by validator and comparator configs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for etl-guard components
    pub base_level: Level,
    /// Whether to log every rule evaluation
    pub log_rule_details: bool,
    /// Whether to log join and diff stages
    pub log_diff_operations: bool,
    /// Maximum length for logged field values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_rule_details: false,
            log_diff_operations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_rule_details: true,
            log_diff_operations: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_rule_details: false,
            log_diff_operations: false,
            max_field_length: 128,
        }
    }

    pub fn balanced() -> Self {
        Self::default()
    }
}

/// Debug logging that is skipped entirely below the configured level.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.base_level >= tracing::Level::DEBUG {
            tracing::debug!($($arg)*);
        }
    };
}

/// Per-rule logging, enabled by `LogConfig::log_rule_details`.
#[macro_export]
macro_rules! log_rule {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_rule_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Diff stage logging, enabled by `LogConfig::log_diff_operations`.
#[macro_export]
macro_rules! log_diff_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_diff_operations {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to at most `max_length` bytes, on a char boundary.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let cut = value
        .char_indices()
        .map(|(idx, _)| idx)
        .take_while(|&idx| idx <= max_length)
        .last()
        .unwrap_or(0);
    format!("{}...(truncated)", &value[..cut])
}

/// Subscriber installation for applications embedding etl-guard.
pub mod setup {
    use tracing::Level;

    /// Configuration for the global `tracing` subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for etl-guard components specifically
        pub crate_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                crate_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                crate_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                crate_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_crate_level(mut self, level: Level) -> Self {
            self.crate_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter directive string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},etl_guard={}",
                    self.level.as_str().to_lowercase(),
                    self.crate_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global subscriber. `RUST_LOG` takes precedence over the
    /// configured filter when set.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use etl_guard::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_log_config_presets() {
        let config = LogConfig::default();
        assert_eq!(config.base_level, Level::INFO);
        assert!(!config.log_rule_details);
        assert!(config.log_diff_operations);

        let verbose = LogConfig::verbose();
        assert_eq!(verbose.base_level, Level::DEBUG);
        assert!(verbose.log_rule_details);

        let production = LogConfig::production();
        assert!(!production.log_diff_operations);
        assert_eq!(production.max_field_length, 128);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text that should be truncated", 10),
            "this is a ...(truncated)"
        );
        // never splits a multi-byte character
        assert_eq!(truncate_field("ééééé", 3), "é...(truncated)");
    }

    #[test]
    fn test_env_filter_string() {
        let config = LoggingConfig::default();
        assert_eq!(config.env_filter(), "info,etl_guard=debug");

        let custom = LoggingConfig::production().with_env_filter("etl_guard=trace");
        assert_eq!(custom.env_filter(), "etl_guard=trace");
    }
}
