//! Persisted record set
//!
//! One JSON document holds everything that must survive a restart. Every
//! sensitive field in it is a hash or ciphertext.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rootguard_common::{load_json_or_default, save_json_atomic};
use rootguard_rootauth::RootAuthRequest;
use rootguard_security::SecretCipher;
use rootguard_vault::VaultRecords;

use crate::error::{GuardError, Result};

/// Current record set layout
pub const STORE_VERSION: u32 = 1;

/// Serialized form of all guard state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecords {
    #[serde(default)]
    pub version: u32,
    /// Hex salt for deriving the secret encryption key
    #[serde(default)]
    pub kdf_salt: Option<String>,
    #[serde(flatten)]
    pub vault: VaultRecords,
    #[serde(default)]
    pub root_auth_audit: Vec<RootAuthRequest>,
}

impl StoreRecords {
    /// Decoded KDF salt
    pub fn kdf_salt_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.kdf_salt
            .as_deref()
            .map(|salt| {
                hex::decode(salt).map_err(|e| GuardError::CorruptStore(format!("kdfSalt: {}", e)))
            })
            .transpose()
    }
}

/// File-backed record set with a load/flush lifecycle
#[derive(Debug, Clone)]
pub struct GuardStore {
    path: PathBuf,
}

impl GuardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record set, creating a fresh one with a new KDF salt if absent
    pub fn load(&self) -> Result<StoreRecords> {
        let mut records: StoreRecords = load_json_or_default(&self.path)?;

        if records.version > STORE_VERSION {
            return Err(GuardError::StoreVersion {
                found: records.version,
                supported: STORE_VERSION,
            });
        }
        if records.kdf_salt.is_none() {
            records.kdf_salt = Some(hex::encode(SecretCipher::generate_kdf_salt()));
            info!(path = %self.path.display(), "Initialised new record set");
        }
        records.kdf_salt_bytes()?;
        records.version = STORE_VERSION;

        debug!(
            path = %self.path.display(),
            sessions = records.vault.sessions.len(),
            audit = records.root_auth_audit.len(),
            "Record set loaded"
        );
        Ok(records)
    }

    /// Atomically replace the record set on disk
    pub fn save(&self, records: &StoreRecords) -> Result<()> {
        save_json_atomic(&self.path, records)?;
        debug!(path = %self.path.display(), "Record set saved");
        Ok(())
    }
}
