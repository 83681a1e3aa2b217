//! Configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use rootguard_permissions::{OperationRegistry, RoleConfig, ToolPolicyConfig};
use rootguard_rootauth::RootAuthConfig;
use rootguard_vault::VaultConfig;

use crate::error::Result;

/// Environment variable holding the local master secret by default
pub const DEFAULT_MASTER_SECRET_ENV: &str = "ROOTGUARD_MASTER_SECRET";

/// Complete RootGuard configuration.
///
/// Unknown keys at any level fail the load instead of being ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Approval flow for critical operations
    #[serde(default, alias = "rootAuth", alias = "rootauth")]
    pub root_auth: RootAuthConfig,
    /// Credentials, sessions and hashing work factor
    #[serde(default)]
    pub vault: VaultConfig,
    /// Channel-to-role overrides
    #[serde(default)]
    pub roles: RoleConfig,
    /// Per-role tool policy
    #[serde(default, alias = "toolPolicy", alias = "toolpolicy")]
    pub tool_policy: ToolPolicyConfig,
    /// Extra sensitive operations
    #[serde(default)]
    pub operations: OperationsConfig,
    /// Persistence settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GuardConfig {
    /// Built-in sensitive operations plus the configured extras
    pub fn registry(&self) -> Result<OperationRegistry> {
        let mut registry = OperationRegistry::with_defaults();
        registry.extend(self.operations.sensitive.iter().cloned())?;
        Ok(registry)
    }
}

/// Operations registered in addition to the built-in set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationsConfig {
    #[serde(default)]
    pub sensitive: Vec<String>,
}

/// Where and how state is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Record set location; defaults to the user data directory
    pub path: Option<PathBuf>,
    /// Environment variable holding the master secret for at-rest encryption
    #[serde(alias = "masterSecretEnv", alias = "mastersecretenv")]
    pub master_secret_env: String,
}

fn default_master_secret_env() -> String {
    DEFAULT_MASTER_SECRET_ENV.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            master_secret_env: default_master_secret_env(),
        }
    }
}

impl StoreConfig {
    /// Configured path or `<data dir>/rootguard/store.json`
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rootguard")
                .join("store.json")
        })
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(alias = "withTarget", alias = "withtarget")]
    pub with_target: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert!(!config.root_auth.enabled);
        assert_eq!(config.vault.session_timeout_minutes, 60);
        assert_eq!(config.store.master_secret_env, DEFAULT_MASTER_SECRET_ENV);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_registry_includes_extra_operations() {
        let mut config = GuardConfig::default();
        config.operations.sensitive.push("crm_export".to_string());

        let registry = config.registry().unwrap();
        assert!(registry.is_sensitive("crm_export"));
        assert!(registry.is_sensitive("file_delete"));
    }

    #[test]
    fn test_registry_rejects_blank_operation() {
        let mut config = GuardConfig::default();
        config.operations.sensitive.push("  ".to_string());
        assert!(config.registry().is_err());
    }

    #[test]
    fn test_explicit_store_path_wins() {
        let store = StoreConfig {
            path: Some(PathBuf::from("/tmp/rg.json")),
            ..StoreConfig::default()
        };
        assert_eq!(store.resolved_path(), PathBuf::from("/tmp/rg.json"));
        assert!(StoreConfig::default().resolved_path().ends_with("rootguard/store.json"));
    }

    #[test]
    fn test_camel_case_sections() {
        let config: GuardConfig = serde_json::from_str(
            r#"{"rootAuth":{"enabled":true,"criticalOperations":["file_delete"],"requestExpiryMinutes":10}}"#,
        )
        .unwrap();
        assert!(config.root_auth.enabled);
        assert_eq!(config.root_auth.critical_operations, vec!["file_delete".to_string()]);
    }
}
