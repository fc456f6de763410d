//! Logging infrastructure for nricon
//!
//! This module provides configurable logging using the `tracing` crate.

use std::fmt;
use tracing::Level;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    #[default]
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level: {s}")),
        }
    }
}

/// Initialize the tracing subscriber with the specified log level.
///
/// This should be called once at application startup. The log level can be
/// overridden by the `RUST_LOG` environment variable.
///
/// # Example
///
/// ```
/// use nricon_common::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .init();
}

/// Initialize logging with a custom filter string.
///
/// Allows fine-grained control over which modules log at which levels.
///
/// # Example
///
/// ```
/// use nricon_common::logging::init_logging_with_filter;
///
/// // Set default to info, but enable debug for the engine
/// init_logging_with_filter("info,nricon_engine=debug");
/// ```
pub fn init_logging_with_filter(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .init();
}
