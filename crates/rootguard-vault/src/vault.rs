//! Credential vault

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use rootguard_common::SharedClock;
use rootguard_security::{
    constant_time_eq, digest, EncryptedData, PasswordHasherService, SecretCipher,
    SecureCodeGenerator,
};

use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::models::{
    AdminCredential, AdminSession, ClientInfo, IssuedTempToken, SessionInfo, SessionRecord,
    TempTokenRecord, TokenPurpose, VaultRecords,
};

/// Random bytes in a temp or session token (256 bits)
const TOKEN_BYTES: usize = 32;

/// Digits in a 2FA code
const CODE_LENGTH: usize = 6;

#[derive(Default)]
struct VaultState {
    credential: Option<AdminCredential>,
    sessions: HashMap<String, SessionRecord>,
    temp_tokens: HashMap<String, TempTokenRecord>,
    secrets: BTreeMap<String, EncryptedData>,
}

/// Admin credential, session and temp token store
pub struct CredentialVault {
    config: VaultConfig,
    hasher: PasswordHasherService,
    cipher: Option<SecretCipher>,
    codes: SecureCodeGenerator,
    clock: SharedClock,
    /// Verified against when no credential exists, so a miss costs one hash too
    decoy_hash: String,
    state: RwLock<VaultState>,
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("CredentialVault")
            .field("has_credential", &state.credential.is_some())
            .field("sessions", &state.sessions.len())
            .field("temp_tokens", &state.temp_tokens.len())
            .field("secrets", &state.secrets.len())
            .field("cipher", &self.cipher.is_some())
            .finish()
    }
}

impl CredentialVault {
    /// Create an empty vault. Fails if the password hasher cannot be built.
    pub fn new(config: VaultConfig, clock: SharedClock) -> Result<Self> {
        config.validate()?;
        let hasher = PasswordHasherService::new(config.hashing)?;
        let codes = SecureCodeGenerator::new();
        let decoy_hash = hasher.hash_password(&codes.generate_token(16)?)?;

        Ok(Self {
            config,
            hasher,
            cipher: None,
            codes,
            clock,
            decoy_hash,
            state: RwLock::new(VaultState::default()),
        })
    }

    /// Rebuild a vault from persisted records, dropping anything expired
    pub fn from_records(
        config: VaultConfig,
        clock: SharedClock,
        records: VaultRecords,
    ) -> Result<Self> {
        let vault = Self::new(config, clock)?;
        {
            let mut state = vault.state.write();
            state.credential = records.credential;
            state.sessions = records
                .sessions
                .into_iter()
                .map(|s| (s.token_hash.clone(), s))
                .collect();
            state.temp_tokens = records
                .temp_tokens
                .into_iter()
                .map(|t| (t.token_hash.clone(), t))
                .collect();
            state.secrets = records.secrets;
        }
        let purged = vault.purge_expired();
        debug!(purged, "Vault restored from records");
        Ok(vault)
    }

    /// Enable secret storage with an already derived cipher
    pub fn with_cipher(mut self, cipher: SecretCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Everything that should be persisted
    pub fn records(&self) -> VaultRecords {
        let state = self.state.read();
        let mut sessions: Vec<SessionRecord> = state.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let mut temp_tokens: Vec<TempTokenRecord> = state.temp_tokens.values().cloned().collect();
        temp_tokens.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));

        VaultRecords {
            credential: state.credential.clone(),
            sessions,
            temp_tokens,
            secrets: state.secrets.clone(),
        }
    }

    /// Store the admin credential, replacing (rotating) any existing one.
    ///
    /// Rotation revokes every open session.
    pub fn create_credential(&self, username: &str, password: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(VaultError::Validation("username must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(VaultError::Validation("password must not be empty".to_string()));
        }

        let password_hash = self.hasher.hash_password(password)?;
        let now = self.clock.now();

        let mut state = self.state.write();
        let credential = match state.credential.take() {
            Some(previous) => {
                let revoked = state.sessions.len();
                state.sessions.clear();
                info!(username, revoked, "Admin credential rotated");
                AdminCredential {
                    username: username.to_string(),
                    password_hash,
                    created_at: previous.created_at,
                    rotated_at: Some(now),
                }
            }
            None => {
                info!(username, "Admin credential created");
                AdminCredential {
                    username: username.to_string(),
                    password_hash,
                    created_at: now,
                    rotated_at: None,
                }
            }
        };
        state.credential = Some(credential);
        Ok(())
    }

    pub fn has_credential(&self) -> bool {
        self.state.read().credential.is_some()
    }

    /// Check a username/password pair. Usernames are case-sensitive.
    pub fn verify_credential(&self, username: &str, password: &str) -> bool {
        let stored = self
            .state
            .read()
            .credential
            .as_ref()
            .map(|c| (c.username.clone(), c.password_hash.clone()));

        match stored {
            Some((stored_username, hash)) => {
                let password_ok = self.hasher.verify_password(password, &hash);
                let username_ok = constant_time_eq(&stored_username, username);
                password_ok && username_ok
            }
            None => {
                let _ = self.hasher.verify_password(password, &self.decoy_hash);
                false
            }
        }
    }

    /// Issue a single-use token and 6-digit code
    pub fn issue_temp_token(&self, purpose: TokenPurpose) -> Result<IssuedTempToken> {
        self.issue(purpose, None)
    }

    /// Redeem a temp token of any purpose for a session
    pub fn redeem_temp_token(
        &self,
        token: &str,
        code: &str,
        client: &ClientInfo,
    ) -> Result<AdminSession> {
        self.redeem(token, code, None, client)
    }

    /// First factor: password check, then a login temp token
    pub fn login(&self, username: &str, password: &str) -> Result<IssuedTempToken> {
        if !self.verify_credential(username, password) {
            warn!(username, "Login rejected");
            return Err(VaultError::InvalidCredentials);
        }
        info!(username, "Password accepted, awaiting second factor");
        self.issue(TokenPurpose::Login, Some(username.to_string()))
    }

    /// Second factor: redeem a login token for a session
    pub fn verify_2fa(&self, token: &str, code: &str, client: &ClientInfo) -> Result<AdminSession> {
        self.redeem(token, code, Some(TokenPurpose::Login), client)
    }

    /// Session details for a live token; expired sessions are removed
    pub fn validate_session(&self, token: &str) -> Option<SessionInfo> {
        let key = digest(token);
        let now = self.clock.now();
        let mut state = self.state.write();

        match state.sessions.get(&key) {
            None => return None,
            Some(session) if now < session.expires_at => return Some(SessionInfo::from(session)),
            Some(_) => {}
        }
        state.sessions.remove(&key);
        debug!("Expired session removed");
        None
    }

    /// Invalidate a session. False if it did not exist.
    pub fn revoke_session(&self, token: &str) -> bool {
        let removed = self.state.write().sessions.remove(&digest(token)).is_some();
        if removed {
            info!("Session revoked");
        }
        removed
    }

    /// Drop expired sessions and temp tokens
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.write();
        let before = state.sessions.len() + state.temp_tokens.len();
        state.sessions.retain(|_, s| now < s.expires_at);
        state.temp_tokens.retain(|_, t| now < t.expires_at);
        let purged = before - (state.sessions.len() + state.temp_tokens.len());
        if purged > 0 {
            debug!(purged, "Purged expired sessions and tokens");
        }
        purged
    }

    pub fn active_sessions(&self) -> usize {
        let now = self.clock.now();
        self.state
            .read()
            .sessions
            .values()
            .filter(|s| now < s.expires_at)
            .count()
    }

    /// Encrypt and store a named secret
    pub fn store_secret(&self, name: &str, plaintext: &str) -> Result<()> {
        let cipher = self.cipher.as_ref().ok_or_else(|| {
            VaultError::Config("secret storage requires a master secret".to_string())
        })?;
        if name.trim().is_empty() {
            return Err(VaultError::Validation("secret name must not be empty".to_string()));
        }

        let encrypted = cipher.encrypt(plaintext)?;
        self.state.write().secrets.insert(name.to_string(), encrypted);
        debug!(name, "Secret stored");
        Ok(())
    }

    /// Decrypt a named secret. Any failure reads as absent.
    pub fn secret(&self, name: &str) -> Option<String> {
        let encrypted = self.state.read().secrets.get(name).cloned()?;
        match self.cipher.as_ref() {
            Some(cipher) => cipher.decrypt_or_none(&encrypted),
            None => {
                warn!(name, "Secret requested but no master secret configured");
                None
            }
        }
    }

    pub fn remove_secret(&self, name: &str) -> bool {
        self.state.write().secrets.remove(name).is_some()
    }

    fn issue(&self, purpose: TokenPurpose, username: Option<String>) -> Result<IssuedTempToken> {
        let token = self.codes.generate_token(TOKEN_BYTES)?;
        let code = self.codes.generate_code(CODE_LENGTH)?;
        let expires_at = self.clock.now() + self.config.temp_token_ttl();

        let record = TempTokenRecord {
            token_hash: digest(&token),
            code_hash: digest(&code),
            purpose,
            username,
            expires_at,
            failed_attempts: 0,
        };
        self.state
            .write()
            .temp_tokens
            .insert(record.token_hash.clone(), record);
        debug!(%purpose, %expires_at, "Temp token issued");

        Ok(IssuedTempToken {
            token,
            code,
            purpose,
            expires_at,
        })
    }

    fn redeem(
        &self,
        token: &str,
        code: &str,
        expected: Option<TokenPurpose>,
        client: &ClientInfo,
    ) -> Result<AdminSession> {
        let key = digest(token);
        let now = self.clock.now();
        let mut state = self.state.write();

        let record = state.temp_tokens.get_mut(&key).ok_or(VaultError::NotFound)?;

        if now >= record.expires_at {
            state.temp_tokens.remove(&key);
            debug!("Expired temp token removed");
            return Err(VaultError::Expired);
        }
        if expected.is_some_and(|purpose| purpose != record.purpose) {
            return Err(VaultError::NotFound);
        }
        if !constant_time_eq(&digest(code.trim()), &record.code_hash) {
            record.failed_attempts += 1;
            let attempts = record.failed_attempts;
            warn!(attempts, "Invalid 2FA code");
            if attempts >= self.config.max_code_attempts {
                state.temp_tokens.remove(&key);
                warn!("Temp token discarded after too many invalid codes");
            }
            return Err(VaultError::InvalidCode);
        }

        let username = state
            .temp_tokens
            .remove(&key)
            .and_then(|record| record.username);
        let session = self.mint_session(&mut state, username, now, client)?;
        info!(
            username = session.username.as_deref().unwrap_or("-"),
            expires_at = %session.expires_at,
            "Session created"
        );
        Ok(session)
    }

    fn mint_session(
        &self,
        state: &mut VaultState,
        username: Option<String>,
        now: DateTime<Utc>,
        client: &ClientInfo,
    ) -> Result<AdminSession> {
        let token = self.codes.generate_token(TOKEN_BYTES)?;
        let expires_at = now + self.config.session_ttl();
        let record = SessionRecord {
            token_hash: digest(&token),
            username: username.clone(),
            created_at: now,
            expires_at,
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
        };
        state.sessions.insert(record.token_hash.clone(), record);

        Ok(AdminSession {
            token,
            username,
            created_at: now,
            expires_at,
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
        })
    }
}
