// Tracing log adapter - Structured logging using tracing crate

use tracing_subscriber::EnvFilter;

use crate::domain::errors::*;
use crate::ports::LogLevel;

/// Installs the global tracing subscriber
pub struct TracingLogAdapter {
    level: LogLevel,
    json_output: bool,
}

impl TracingLogAdapter {
    /// Initialize logging to stderr.
    ///
    /// `RUST_LOG` wins over `level` when set. Calling this twice keeps the
    /// first subscriber.
    pub fn init(level: LogLevel, json_output: bool) -> Result<Self, DomainError> {
        let filter = Self::build_filter(level, std::env::var("RUST_LOG").ok().as_deref())?;

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false);

        let _ = if json_output {
            builder.json().try_init()
        } else {
            builder.try_init()
        };

        Ok(Self { level, json_output })
    }

    /// Filter for `level`, overridden by a non-empty `RUST_LOG` directive
    pub fn build_filter(level: LogLevel, rust_log: Option<&str>) -> Result<EnvFilter, DomainError> {
        match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
            Some(directives) => EnvFilter::try_new(directives)
                .map_err(|e| DomainError::BadArgs(format!("Invalid RUST_LOG: {}", e))),
            None => EnvFilter::try_new(format!("eddit_cli={0},eddit={0},warn", level.as_str()))
                .map_err(|e| DomainError::InternalError(format!("log filter: {}", e))),
        }
    }

    /// Convert domain log level to tracing level
    pub fn to_tracing_level(level: LogLevel) -> tracing::Level {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn is_json(&self) -> bool {
        self.json_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_level() {
        let filter = TracingLogAdapter::build_filter(LogLevel::Debug, None).unwrap();
        assert!(filter.to_string().contains("eddit_cli=debug"));
    }

    #[test]
    fn test_rust_log_overrides_level() {
        let filter = TracingLogAdapter::build_filter(LogLevel::Info, Some("trace")).unwrap();
        assert_eq!(filter.to_string(), "trace");

        let filter = TracingLogAdapter::build_filter(LogLevel::Warn, Some("  ")).unwrap();
        assert!(filter.to_string().contains("eddit_cli=warn"));
    }

    #[test]
    fn test_tracing_level_mapping() {
        assert_eq!(
            TracingLogAdapter::to_tracing_level(LogLevel::Error),
            tracing::Level::ERROR
        );
    }
}
