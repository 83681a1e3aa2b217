//! Error types for the permissions system

use thiserror::Error;

/// Result type for permissions operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the permissions system
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Operation '{operation}' referenced by {context} is not a registered operation")]
    UnknownOperation { operation: String, context: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
