//! Vault settings

use chrono::Duration;
use serde::{Deserialize, Serialize};

use rootguard_security::HashingParams;

use crate::error::{Result, VaultError};

/// Session, token and hashing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// Absolute session lifetime, no sliding renewal
    #[serde(alias = "sessionTimeoutMinutes", alias = "sessiontimeoutminutes")]
    pub session_timeout_minutes: u32,
    /// Lifetime of a login / 2FA temp token
    #[serde(alias = "tempTokenTtlMinutes", alias = "temptokenttlminutes")]
    pub temp_token_ttl_minutes: u32,
    /// Wrong codes tolerated before a temp token is discarded
    #[serde(alias = "maxCodeAttempts", alias = "maxcodeattempts")]
    pub max_code_attempts: u32,
    /// Argon2id work factor for credentials and key derivation
    pub hashing: HashingParams,
}

fn default_session_timeout() -> u32 {
    60
}

fn default_temp_token_ttl() -> u32 {
    10
}

fn default_max_code_attempts() -> u32 {
    5
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            session_timeout_minutes: default_session_timeout(),
            temp_token_ttl_minutes: default_temp_token_ttl(),
            max_code_attempts: default_max_code_attempts(),
            hashing: HashingParams::default(),
        }
    }
}

impl VaultConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.session_timeout_minutes))
    }

    pub fn temp_token_ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.temp_token_ttl_minutes))
    }

    /// Check that every lifetime and limit is positive
    pub fn validate(&self) -> Result<()> {
        if self.session_timeout_minutes == 0 {
            return Err(VaultError::Config(
                "session_timeout_minutes must be greater than 0".to_string(),
            ));
        }
        if self.temp_token_ttl_minutes == 0 {
            return Err(VaultError::Config(
                "temp_token_ttl_minutes must be greater than 0".to_string(),
            ));
        }
        if self.max_code_attempts == 0 {
            return Err(VaultError::Config(
                "max_code_attempts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
