//! Logging configuration and utilities.

use std::sync::OnceLock;

use regex::Regex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl From<LogLevel> for tracing::level_filters::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON lines, for log shippers.
    Json,
    /// Compact single-line format.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Include the module target.
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a new logging configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the log format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets whether to include the module target.
    #[must_use]
    pub fn with_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }

    /// Installs a global `tracing` subscriber.
    ///
    /// `RUST_LOG` directives are honoured on top of the configured level.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed.
    pub fn init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let filter = EnvFilter::from_default_env().add_directive(
            tracing::level_filters::LevelFilter::from(self.level).into(),
        );

        match self.format {
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(self.include_target))
                .try_init()?,
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .try_init()?,
            LogFormat::Compact => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact())
                .try_init()?,
        }

        Ok(())
    }
}

fn redaction_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"SG\.[A-Za-z0-9_\-]+\.[A-Za-z0-9_\-]+", "SG.***"),
            (r"Bearer [A-Za-z0-9_.\-]+", "Bearer ***"),
            (r#"(?i)"?api[_-]?key"?\s*[=:]\s*"?[^\s,"}]+"?"#, "api_key=***"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// Masks API keys and bearer tokens in text bound for the logs.
pub fn redact(text: &str) -> String {
    redaction_patterns()
        .iter()
        .fold(text.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

/// Redacts and truncates a body for logging.
pub fn loggable_body(body: &str, max_len: usize) -> String {
    let redacted = redact(body);
    match redacted.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...", &redacted[..idx]),
        None => redacted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_builders() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_target(false);

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.include_target);
    }

    #[test]
    fn test_redacts_sendgrid_key() {
        let redacted = redact("key SG.abc123.def456 leaked");
        assert!(!redacted.contains("abc123"));
        assert!(redacted.contains("SG.***"));
    }

    #[test]
    fn test_redacts_bearer_token() {
        let redacted = redact("Authorization: Bearer SG.abc.def");
        assert!(!redacted.contains("abc"));
    }

    #[test]
    fn test_redacts_api_key_field() {
        let redacted = redact(r#"{"api_key": "secret-value"}"#);
        assert!(!redacted.contains("secret-value"));
    }

    #[test]
    fn test_loggable_body_truncates() {
        let body = "a".repeat(20);
        assert_eq!(loggable_body(&body, 5), "aaaaa...");
        assert_eq!(loggable_body("short", 10), "short");
    }
}
