//! # RootGuard Security
//!
//! Cryptographic primitives used by the access-control core.
//!
//! This crate provides:
//! - Numeric one-time codes and opaque hex tokens from the OS CSPRNG
//! - Argon2id password hashing with a boot-time self-test
//! - AES-256-GCM encryption of at-rest secrets under an Argon2id-derived key

pub mod codes;
pub mod encryption;
pub mod error;
pub mod password;

pub use codes::{constant_time_eq, digest, SecureCodeGenerator};
pub use encryption::{EncryptedData, SecretCipher};
pub use error::SecurityError;
pub use password::{HashingParams, PasswordHasherService};

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, SecurityError>;
