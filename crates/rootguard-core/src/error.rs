//! Error types for the guard facade

use thiserror::Error;

/// Result type for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Every error a guard operation can surface
#[derive(Error, Debug)]
pub enum GuardError {
    #[error(transparent)]
    Config(#[from] rootguard_config::ConfigError),

    #[error(transparent)]
    Permissions(#[from] rootguard_permissions::Error),

    #[error(transparent)]
    RootAuth(#[from] rootguard_rootauth::RootAuthError),

    #[error(transparent)]
    Vault(#[from] rootguard_vault::VaultError),

    #[error(transparent)]
    Security(#[from] rootguard_security::SecurityError),

    #[error("Store error: {0}")]
    Store(#[from] rootguard_common::JsonStoreError),

    #[error("Unsupported store version {found} (expected at most {supported})")]
    StoreVersion { found: u32, supported: u32 },

    #[error("Corrupt store: {0}")]
    CorruptStore(String),
}

impl GuardError {
    /// Errors that must abort startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GuardError::Security(rootguard_security::SecurityError::CryptoUnavailable { .. })
                | GuardError::Vault(rootguard_vault::VaultError::Security(
                    rootguard_security::SecurityError::CryptoUnavailable { .. }
                ))
                | GuardError::StoreVersion { .. }
                | GuardError::CorruptStore(_)
        )
    }
}
