//! Argon2id password hashing
//!
//! The hasher is constructed once at boot. Construction runs a hash/verify
//! round trip, so a broken or misconfigured backend is reported as
//! [`SecurityError::CryptoUnavailable`] before any credential is touched.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codes::SecureCodeGenerator;
use crate::{Result, SecurityError};

/// Argon2 work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HashingParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashingParams {
    /// Cheap parameters for tests. Never use in production.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Check that Argon2 accepts these parameters without hashing anything
    pub fn validate(&self) -> Result<()> {
        self.build(None).map(|_| ())
    }

    /// Build an Argon2id instance producing `output_len` bytes.
    pub(crate) fn build(&self, output_len: Option<usize>) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, output_len)
            .map_err(|e| SecurityError::CryptoUnavailable {
                message: format!("invalid argon2 parameters: {}", e),
            })?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Password hashing service
#[derive(Clone)]
pub struct PasswordHasherService {
    argon2: Argon2<'static>,
    params: HashingParams,
}

impl std::fmt::Debug for PasswordHasherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasherService")
            .field("params", &self.params)
            .finish()
    }
}

impl PasswordHasherService {
    /// Create the hasher and run the boot self-test
    pub fn new(params: HashingParams) -> Result<Self> {
        let service = Self {
            argon2: params.build(None)?,
            params,
        };
        service.self_test()?;
        debug!(
            memory_kib = params.memory_kib,
            iterations = params.iterations,
            "Password hasher ready"
        );
        Ok(service)
    }

    /// Configured work factor
    pub fn params(&self) -> HashingParams {
        self.params
    }

    /// Hash a password into a PHC string (algorithm, params, salt and hash).
    pub fn hash_password(&self, plaintext: &str) -> Result<String> {
        let salt_bytes: [u8; 16] = SecureCodeGenerator::new().generate_bytes();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| SecurityError::PasswordHash {
            message: e.to_string(),
        })?;

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| SecurityError::PasswordHash {
                message: e.to_string(),
            })?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC string.
    ///
    /// The comparison is performed by the argon2 crate in constant time. A
    /// malformed stored hash verifies as `false`.
    pub fn verify_password(&self, plaintext: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    fn self_test(&self) -> Result<()> {
        let probe = "rootguard-self-test";
        let hash = self
            .hash_password(probe)
            .map_err(|e| SecurityError::CryptoUnavailable {
                message: format!("self-test hash failed: {}", e),
            })?;

        if !self.verify_password(probe, &hash) || self.verify_password("wrong", &hash) {
            return Err(SecurityError::CryptoUnavailable {
                message: "self-test verification mismatch".to_string(),
            });
        }
        Ok(())
    }
}
