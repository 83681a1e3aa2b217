//! Logging initialisation
//!
//! All rootguard crates log through `tracing`. Binaries and tests that want
//! output call [`init`] once; later calls are ignored.

use tracing_subscriber::EnvFilter;

/// Log levels accepted by [`LogOptions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Minimum log level when `RUST_LOG` is not set
    pub level: LogLevel,
    /// Include module targets in output
    pub with_target: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_target: true,
        }
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `options.level`. Returns `false` when a
/// subscriber was already installed.
pub fn init(options: LogOptions) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.level.as_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(options.with_target)
        .try_init()
        .is_ok()
}
