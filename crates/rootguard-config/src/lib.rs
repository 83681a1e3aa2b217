//! RootGuard Configuration Management
//!
//! Loads [`GuardConfig`] from an optional TOML file layered with
//! `ROOTGUARD__*` environment variables, and validates every section against
//! the others before anything is built from it.

pub mod error;
pub mod manager;
pub mod types;

pub use error::{ConfigError, Result};
pub use manager::ConfigManager;
pub use types::{GuardConfig, LoggingConfig, OperationsConfig, StoreConfig};
