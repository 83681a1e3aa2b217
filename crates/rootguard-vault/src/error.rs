//! Error types for the vault

use thiserror::Error;

/// Result type for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Vault errors
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Token not found")]
    NotFound,

    #[error("Token expired")]
    Expired,

    #[error("Invalid code")]
    InvalidCode,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security error: {0}")]
    Security(#[from] rootguard_security::SecurityError),
}
