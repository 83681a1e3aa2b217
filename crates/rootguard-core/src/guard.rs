//! The access guard facade

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use rootguard_common::{SharedClock, SystemClock};
use rootguard_config::{ConfigManager, GuardConfig};
use rootguard_permissions::{Role, RoleResolver, ToolAccessFilter};
use rootguard_rootauth::{LogNotifier, OutOfBandNotifier, RootAuthRequest, RootAuthorizationManager};
use rootguard_security::SecretCipher;
use rootguard_vault::{AdminSession, ClientInfo, CredentialVault, IssuedTempToken, SessionInfo};

use crate::decision::AccessDecision;
use crate::error::Result;
use crate::store::{GuardStore, StoreRecords, STORE_VERSION};

/// Collaborators injected into an [`AccessGuard`]
#[derive(Clone)]
pub struct GuardOptions {
    /// Out-of-band channel for approval codes
    pub notifier: Arc<dyn OutOfBandNotifier>,
    /// Time source for every expiry decision
    pub clock: SharedClock,
    /// Persist state here; in-memory only when `None`
    pub store_path: Option<PathBuf>,
    /// Local secret for at-rest encryption; secret storage is off when `None`
    pub master_secret: Option<Vec<u8>>,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            notifier: Arc::new(LogNotifier),
            clock: SystemClock::shared(),
            store_path: None,
            master_secret: None,
        }
    }
}

impl fmt::Debug for GuardOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardOptions")
            .field("clock", &self.clock)
            .field("store_path", &self.store_path)
            .field("master_secret", &self.master_secret.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// Role resolution, tool filtering, root authorization and admin sessions
pub struct AccessGuard {
    config: GuardConfig,
    resolver: RoleResolver,
    filter: ToolAccessFilter,
    root_auth: RootAuthorizationManager,
    vault: CredentialVault,
    store: Option<GuardStore>,
    kdf_salt: Option<String>,
}

impl fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard")
            .field("resolver", &self.resolver)
            .field("filter", &self.filter)
            .field("root_auth", &self.root_auth)
            .field("vault", &self.vault)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl AccessGuard {
    /// Validate `config` and build every component.
    ///
    /// With a store path, persisted state is loaded first. Fails with a
    /// crypto error if the password hasher or key derivation is unusable.
    pub fn new(config: GuardConfig, options: GuardOptions) -> Result<Self> {
        let registry = ConfigManager::default().validate_config(&config)?;
        let resolver = RoleResolver::new(&config.roles);
        let filter = ToolAccessFilter::new(&config.tool_policy, &registry)?;

        let store = options.store_path.map(GuardStore::new);
        let mut records = match &store {
            Some(store) => store.load()?,
            None => StoreRecords::default(),
        };
        if records.kdf_salt.is_none() {
            records.kdf_salt = Some(hex::encode(SecretCipher::generate_kdf_salt()));
        }

        let mut vault = CredentialVault::from_records(
            config.vault.clone(),
            options.clock.clone(),
            records.vault.clone(),
        )?;
        if let Some(secret) = &options.master_secret {
            let salt = records.kdf_salt_bytes()?.unwrap_or_default();
            let cipher = SecretCipher::derive(secret, &salt, &config.vault.hashing)?;
            vault = vault.with_cipher(cipher);
        }

        let root_auth = RootAuthorizationManager::new(options.notifier, options.clock);
        root_auth.restore(records.root_auth_audit);

        info!(
            roles = resolver.len(),
            root_auth = config.root_auth.enabled,
            persistent = store.is_some(),
            "Access guard ready"
        );

        Ok(Self {
            config,
            resolver,
            filter,
            root_auth,
            vault,
            store,
            kdf_salt: records.kdf_salt,
        })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn root_auth(&self) -> &RootAuthorizationManager {
        &self.root_auth
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    // ---------------------------------------------------------------------
    // Roles and tool policy
    // ---------------------------------------------------------------------

    pub fn resolve_role(&self, channel_id: &str) -> Role {
        self.resolver.resolve(channel_id)
    }

    pub fn can_use_tool(&self, role: Role, operation: &str) -> bool {
        self.filter.can_use(role, operation)
    }

    pub fn filter_tools<I, S>(&self, role: Role, operations: I) -> Vec<S>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter.filter_tools(role, operations)
    }

    /// Full decision for one inbound request.
    ///
    /// A critical operation without a usable approval opens a pending request
    /// (or reuses the caller's open one) and reports `ApprovalRequired`.
    pub fn authorize(
        &self,
        channel_id: &str,
        user_id: &str,
        operation: &str,
    ) -> Result<AccessDecision> {
        let role = self.resolve_role(channel_id);

        if !self.filter.can_use(role, operation) {
            info!(
                channel = channel_id,
                user = user_id,
                %role,
                operation,
                "Operation denied by policy"
            );
            return Ok(AccessDecision::Denied { role });
        }
        if role.has_blanket_authority() {
            return Ok(AccessDecision::Allowed { role });
        }
        if self
            .root_auth
            .can_perform(operation, user_id, &self.config.root_auth)
        {
            return Ok(AccessDecision::Allowed { role });
        }

        let reason = format!("{} requested {} via {}", user_id, operation, channel_id);
        let (request, created) = self.root_auth.open_or_reuse(
            operation,
            &reason,
            user_id,
            channel_id,
            &self.config.root_auth,
        )?;
        if !created {
            debug!(id = %request.id, user = user_id, operation, "Approval already pending");
        }

        Ok(AccessDecision::ApprovalRequired {
            role,
            request_id: request.id,
        })
    }

    // ---------------------------------------------------------------------
    // Root authorization
    // ---------------------------------------------------------------------

    pub fn create_root_auth_request(
        &self,
        operation: &str,
        reason: &str,
        requester_id: &str,
        requester_channel: &str,
    ) -> Result<RootAuthRequest> {
        Ok(self.root_auth.create(
            operation,
            reason,
            requester_id,
            requester_channel,
            &self.config.root_auth,
        )?)
    }

    pub fn approve_root_auth_request(&self, id: &str) -> bool {
        self.root_auth.approve(id, &self.config.root_auth)
    }

    /// Approve with the confirmation code sent to the approver
    pub fn approve_root_auth_request_with_code(&self, id: &str, code: &str) -> Result<bool> {
        Ok(self
            .root_auth
            .approve_with_code(id, code, &self.config.root_auth)?)
    }

    pub fn deny_root_auth_request(&self, id: &str) -> bool {
        self.root_auth.deny(id, &self.config.root_auth)
    }

    pub fn can_perform_operation(&self, operation: &str, requester_id: &str) -> bool {
        self.root_auth
            .can_perform(operation, requester_id, &self.config.root_auth)
    }

    // ---------------------------------------------------------------------
    // Admin credential and sessions
    // ---------------------------------------------------------------------

    pub fn create_credential(&self, username: &str, password: &str) -> Result<()> {
        Ok(self.vault.create_credential(username, password)?)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<IssuedTempToken> {
        Ok(self.vault.login(username, password)?)
    }

    pub fn verify_2fa(&self, temp_token: &str, code: &str) -> Result<AdminSession> {
        self.verify_2fa_from(temp_token, code, &ClientInfo::default())
    }

    /// Second factor, recording the client on the new session
    pub fn verify_2fa_from(
        &self,
        temp_token: &str,
        code: &str,
        client: &ClientInfo,
    ) -> Result<AdminSession> {
        Ok(self.vault.verify_2fa(temp_token, code, client)?)
    }

    pub fn validate_session(&self, token: &str) -> Option<SessionInfo> {
        self.vault.validate_session(token)
    }

    pub fn revoke_session(&self, token: &str) -> bool {
        self.vault.revoke_session(token)
    }

    pub fn store_secret(&self, name: &str, plaintext: &str) -> Result<()> {
        Ok(self.vault.store_secret(name, plaintext)?)
    }

    pub fn secret(&self, name: &str) -> Option<String> {
        self.vault.secret(name)
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Current state as a record set
    pub fn records(&self) -> StoreRecords {
        StoreRecords {
            version: STORE_VERSION,
            kdf_salt: self.kdf_salt.clone(),
            vault: self.vault.records(),
            root_auth_audit: self.root_auth.snapshot(),
        }
    }

    /// Write state to the store. No-op for an in-memory guard.
    pub fn flush(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.save(&self.records()),
            None => {
                debug!("No store configured, flush skipped");
                Ok(())
            }
        }
    }

    /// Finish notification dispatches, purge stale state and flush
    pub async fn shutdown(&self) -> Result<()> {
        self.root_auth.flush_notifications().await;
        let purged_requests = self.root_auth.purge_resolved(&self.config.root_auth);
        let purged_sessions = self.vault.purge_expired();
        if let Err(e) = self.flush() {
            warn!(error = %e, "Failed to persist state during shutdown");
            return Err(e);
        }
        info!(purged_requests, purged_sessions, "Access guard shut down");
        Ok(())
    }
}
