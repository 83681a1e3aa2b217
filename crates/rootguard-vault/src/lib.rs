//! # RootGuard Vault
//!
//! Durable storage for the administrator's login credential, active
//! sessions, single-use 2FA tokens and encrypted secrets.
//!
//! Nothing sensitive is held in clear form: passwords are argon2id PHC
//! strings, session and temp tokens are keyed by their SHA-256 hash, codes
//! are stored as hashes, and secrets are AES-256-GCM ciphertext.

pub mod config;
pub mod error;
pub mod models;
pub mod vault;

pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use models::{
    AdminCredential, AdminSession, ClientInfo, IssuedTempToken, SessionInfo, SessionRecord,
    TempTokenRecord, TokenPurpose, VaultRecords,
};
pub use vault::CredentialVault;
