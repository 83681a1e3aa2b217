//! Security-related error types

use thiserror::Error;

/// Security operation errors
#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Encryption error: {message}")]
    Encryption { message: String },

    #[error("Decryption error: {message}")]
    Decryption { message: String },

    #[error("Key derivation error: {message}")]
    KeyDerivation { message: String },

    #[error("Password hashing error: {message}")]
    PasswordHash { message: String },

    #[error("Cryptographic backend unavailable: {message}")]
    CryptoUnavailable { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
