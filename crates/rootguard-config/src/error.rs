//! Configuration error types

use thiserror::Error;

/// Configuration result type
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Policy error: {0}")]
    Policy(#[from] rootguard_permissions::Error),

    #[error("Root authorization config error: {0}")]
    RootAuth(#[from] rootguard_rootauth::RootAuthError),

    #[error("Vault config error: {0}")]
    Vault(#[from] rootguard_vault::VaultError),

    #[error("Security error: {0}")]
    Security(#[from] rootguard_security::SecurityError),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
