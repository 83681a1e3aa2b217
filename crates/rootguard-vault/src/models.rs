//! Vault data models
//!
//! `*Record` types are what gets persisted. `AdminSession` and
//! `IssuedTempToken` carry clear tokens and exist only in memory, handed to
//! the caller once.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rootguard_security::EncryptedData;

/// Administrator login credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCredential {
    pub username: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub rotated_at: Option<DateTime<Utc>>,
}

/// What a temp token may be redeemed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    /// Second factor of a password login
    Login,
    /// Step-up confirmation for an already authenticated admin
    Approval,
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenPurpose::Login => write!(f, "login"),
            TokenPurpose::Approval => write!(f, "approval"),
        }
    }
}

/// Persisted temp token, keyed by token hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempTokenRecord {
    pub token_hash: String,
    pub code_hash: String,
    pub purpose: TokenPurpose,
    pub username: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub failed_attempts: u32,
}

/// Persisted session, keyed by token hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub token_hash: String,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Client details recorded on a new session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            user_agent: Some(user_agent.into()),
        }
    }
}

/// Freshly issued temp token with its clear code
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedTempToken {
    pub token: String,
    pub code: String,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedTempToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedTempToken")
            .field("token", &"<redacted>")
            .field("code", &"<redacted>")
            .field("purpose", &self.purpose)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Freshly minted session with its clear bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub token: String,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSession")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Session details without the token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl From<&SessionRecord> for SessionInfo {
    fn from(record: &SessionRecord) -> Self {
        Self {
            username: record.username.clone(),
            created_at: record.created_at,
            expires_at: record.expires_at,
            ip: record.ip.clone(),
            user_agent: record.user_agent.clone(),
        }
    }
}

/// Everything the vault persists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecords {
    #[serde(default)]
    pub credential: Option<AdminCredential>,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    #[serde(default)]
    pub temp_tokens: Vec<TempTokenRecord>,
    #[serde(default)]
    pub secrets: BTreeMap<String, EncryptedData>,
}
