//! Subscriber installation and logging configuration.
//!
//! # Design
//! - `init_logging` installs the process-wide subscriber once and reports
//!   failure when one is already present.
//! - `init_test_logging` is idempotent and routes output through the libtest
//!   capture writer, so every test may call it.

use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Default logging target when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default level for test binaries; keeps sort fallbacks and orphans visible.
pub const DEFAULT_TEST_LOG_LEVEL: &str = "warn";

/// Environment variable overriding the test log level.
pub const TEST_LOG_ENV: &str = "TESTIFY_LOG";

/// Environment variable selecting the test log format (`json` or `pretty`).
pub const TEST_LOG_FORMAT_ENV: &str = "TESTIFY_LOG_FORMAT";

static TEST_LOGGING: OnceCell<()> = OnceCell::new();

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the tracing subscriber cannot be installed (for example,
/// because another subscriber has already been set globally).
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    install_fmt_subscriber(config, false)
}

/// Install a test-friendly subscriber exactly once per process.
///
/// The level comes from `TESTIFY_LOG` (falling back to `warn`) unless
/// `RUST_LOG` is set. An already installed global subscriber is left alone.
pub fn init_test_logging() {
    TEST_LOGGING.get_or_init(|| {
        let level = std::env::var(TEST_LOG_ENV).ok();
        let format = std::env::var(TEST_LOG_FORMAT_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(LogFormat::Pretty);
        let config = LoggingConfig {
            level: level.as_deref().unwrap_or(DEFAULT_TEST_LOG_LEVEL),
            format,
        };
        // Another harness may already own the global subscriber.
        if let Some(notice) = install_failure_notice(&install_fmt_subscriber(&config, true)) {
            eprintln!("{notice}");
        }
    });
}

fn install_failure_notice(installed: &Result<()>) -> Option<String> {
    installed.as_ref().err().map(|err| {
        format!("test logging not installed ({err}); keeping the existing subscriber")
    })
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level string (e.g., `info`, `debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable, pretty-printed logs.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(TelemetryError::UnknownLogFormat {
                value: value.to_string(),
            }),
        }
    }
}

fn install_fmt_subscriber(config: &LoggingConfig<'_>, test_writer: bool) -> Result<()> {
    let filter = build_env_filter(config.level);
    let installed = match (config.format, test_writer) {
        (LogFormat::Json, false) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init(),
        (LogFormat::Json, true) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_test_writer(),
            )
            .try_init(),
        (LogFormat::Pretty, false) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_thread_ids(false))
            .try_init(),
        (LogFormat::Pretty, true) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_test_writer())
            .try_init(),
    };
    installed.map_err(|source| TelemetryError::SubscriberInstall { source })
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_known_names() -> Result<()> {
        assert_eq!("json".parse::<LogFormat>()?, LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>()?, LogFormat::Pretty);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(TelemetryError::UnknownLogFormat { value }) if value == "xml"
        ));
        Ok(())
    }

    #[test]
    fn default_config_uses_info_level() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.format, LogFormat::infer());
    }

    #[test]
    fn test_logging_is_idempotent_and_blocks_second_global_install() {
        init_test_logging();
        init_test_logging();
        tracing::warn!("emitted through the test subscriber");

        let config = LoggingConfig {
            level: "debug",
            format: LogFormat::Json,
        };
        let second = init_logging(&config);
        assert!(matches!(
            second,
            Err(TelemetryError::SubscriberInstall { .. })
        ));
        assert_eq!(
            install_failure_notice(&second).as_deref(),
            Some(
                "test logging not installed (failed to install tracing subscriber); keeping the existing subscriber"
            )
        );
        assert_eq!(install_failure_notice(&Ok(())), None);
    }
}
