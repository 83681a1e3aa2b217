//! Error types for root authorization

use thiserror::Error;

/// Result type for root authorization operations
pub type Result<T> = std::result::Result<T, RootAuthError>;

/// Errors raised by the approval state machine
#[derive(Error, Debug)]
pub enum RootAuthError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Root authorization request not found: {0}")]
    NotFound(String),

    #[error("Root authorization request expired: {0}")]
    Expired(String),

    #[error("Invalid confirmation code for request {0}")]
    InvalidCode(String),

    #[error("Could not allocate a unique request id after {attempts} attempts")]
    Duplicate { attempts: usize },

    #[error("Policy error: {0}")]
    Policy(#[from] rootguard_permissions::Error),

    #[error("Security error: {0}")]
    Security(#[from] rootguard_security::SecurityError),
}
