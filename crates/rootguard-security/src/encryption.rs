//! At-rest encryption of non-hash secrets
//!
//! The master key is derived once per process with Argon2id from a local
//! secret and a persisted KDF salt. Each record gets its own random salt
//! (mixed into a per-record subkey) and a fresh 96-bit nonce.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::codes::SecureCodeGenerator;
use crate::password::HashingParams;
use crate::{Result, SecurityError};

/// Domain separation for per-record subkeys
const SUBKEY_CONTEXT: &[u8] = b"rootguard-record-key-v1";

/// Encrypted data structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    /// Base64-encoded per-record salt
    pub salt: String,
    /// Base64-encoded nonce
    pub nonce: String,
    /// Base64-encoded ciphertext (includes the GCM tag)
    pub ciphertext: String,
}

/// Symmetric cipher for at-rest secrets.
///
/// Holds the derived master key; it is deliberately neither `Clone` nor
/// serializable, and its `Debug` output never shows key material.
pub struct SecretCipher {
    master_key: [u8; 32],
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("master_key", &"<redacted>")
            .finish()
    }
}

impl SecretCipher {
    /// Derive the master key from a local secret with Argon2id
    pub fn derive(master_secret: &[u8], kdf_salt: &[u8], params: &HashingParams) -> Result<Self> {
        if master_secret.is_empty() {
            return Err(SecurityError::KeyDerivation {
                message: "master secret is empty".to_string(),
            });
        }

        let mut master_key = [0u8; 32];
        params
            .build(Some(master_key.len()))?
            .hash_password_into(master_secret, kdf_salt, &mut master_key)
            .map_err(|e| SecurityError::KeyDerivation {
                message: e.to_string(),
            })?;

        Ok(Self { master_key })
    }

    /// Generate a fresh KDF salt to persist alongside the records
    pub fn generate_kdf_salt() -> [u8; 16] {
        SecureCodeGenerator::new().generate_bytes()
    }

    /// Encrypt a secret
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedData> {
        let generator = SecureCodeGenerator::new();
        let salt: [u8; 16] = generator.generate_bytes();
        let nonce: [u8; 12] = generator.generate_bytes();

        let cipher = Aes256Gcm::new(&self.subkey(&salt).into());
        let ciphertext = cipher
            .encrypt(aes_gcm::Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| SecurityError::Encryption {
                message: e.to_string(),
            })?;

        Ok(EncryptedData {
            salt: general_purpose::STANDARD.encode(salt),
            nonce: general_purpose::STANDARD.encode(nonce),
            ciphertext: general_purpose::STANDARD.encode(ciphertext),
        })
    }

    /// Decrypt a secret
    pub fn decrypt(&self, encrypted: &EncryptedData) -> Result<String> {
        let salt = general_purpose::STANDARD.decode(&encrypted.salt)?;
        let nonce_bytes = general_purpose::STANDARD.decode(&encrypted.nonce)?;
        let ciphertext = general_purpose::STANDARD.decode(&encrypted.ciphertext)?;

        if nonce_bytes.len() != 12 {
            return Err(SecurityError::Decryption {
                message: format!("nonce must be 12 bytes, got {}", nonce_bytes.len()),
            });
        }

        let cipher = Aes256Gcm::new(&self.subkey(&salt).into());
        let plaintext = cipher
            .decrypt(aes_gcm::Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| SecurityError::Decryption {
                message: e.to_string(),
            })?;

        String::from_utf8(plaintext).map_err(Into::into)
    }

    /// Decrypt, treating any failure as an absent value.
    ///
    /// Never falls back to interpreting the stored bytes as plaintext.
    pub fn decrypt_or_none(&self, encrypted: &EncryptedData) -> Option<String> {
        match self.decrypt(encrypted) {
            Ok(plaintext) => Some(plaintext),
            Err(e) => {
                warn!("Discarding undecryptable secret: {}", e);
                None
            }
        }
    }

    fn subkey(&self, salt: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(SUBKEY_CONTEXT);
        hasher.update(self.master_key);
        hasher.update(salt);
        hasher.finalize().into()
    }
}
