//! Tool policy configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::permission::models::PolicyMode;
use crate::registry::OperationRegistry;
use crate::role::Role;
use crate::error::Result;

const SUPPORT_DENIED: &[&str] = &[
    "file_delete",
    "shell_exec",
    "process_kill",
    "db_drop",
    "payment_create",
    "purchase_order",
    "config_update",
    "user_manage",
    "credential_rotate",
    "deploy",
    "package_install",
];

const PURCHASING_DENIED: &[&str] = &[
    "file_delete",
    "shell_exec",
    "process_kill",
    "db_drop",
    "config_update",
    "user_manage",
    "credential_rotate",
    "deploy",
    "package_install",
];

const INTERNAL_DENIED: &[&str] = &["db_drop", "user_manage", "credential_rotate"];

/// Per-role tool policy.
///
/// Fields missing from a partial section keep the values of
/// [`ToolPolicyConfig::default`], so the built-in denylists survive a section
/// that only sets `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolPolicyConfig {
    /// Treatment of operations absent from a role's lists
    pub mode: PolicyMode,
    /// Operations each role may never use
    pub denylists: HashMap<Role, Vec<String>>,
    /// Operations each role may use in [`PolicyMode::Allowlist`] mode
    pub allowlists: HashMap<Role, Vec<String>>,
}

impl ToolPolicyConfig {
    /// Policy with no restrictions at all
    pub fn empty(mode: PolicyMode) -> Self {
        Self {
            mode,
            denylists: HashMap::new(),
            allowlists: HashMap::new(),
        }
    }

    /// Add an operation to a role's denylist
    pub fn deny(&mut self, role: Role, operation: impl Into<String>) -> &mut Self {
        self.denylists.entry(role).or_default().push(operation.into());
        self
    }

    /// Add an operation to a role's allowlist
    pub fn allow(&mut self, role: Role, operation: impl Into<String>) -> &mut Self {
        self.allowlists.entry(role).or_default().push(operation.into());
        self
    }

    /// Denylist for a role (empty if none configured)
    pub fn denylist(&self, role: Role) -> &[String] {
        self.denylists.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check every referenced operation against the registry
    pub fn validate(&self, registry: &OperationRegistry) -> Result<()> {
        for (role, ops) in &self.denylists {
            registry.validate_all(ops, &format!("denylist of role '{}'", role))?;
        }
        for (role, ops) in &self.allowlists {
            registry.validate_all(ops, &format!("allowlist of role '{}'", role))?;
        }
        Ok(())
    }
}

impl Default for ToolPolicyConfig {
    /// Denylist mode; `public` is denied every built-in sensitive operation
    fn default() -> Self {
        let to_vec = |ops: &[&str]| ops.iter().map(|op| op.to_string()).collect::<Vec<_>>();

        let mut denylists = HashMap::new();
        denylists.insert(
            Role::Public,
            to_vec(crate::registry::BUILTIN_SENSITIVE_OPERATIONS),
        );
        denylists.insert(Role::Support, to_vec(SUPPORT_DENIED));
        denylists.insert(Role::Purchasing, to_vec(PURCHASING_DENIED));
        denylists.insert(Role::Internal, to_vec(INTERNAL_DENIED));

        Self {
            mode: PolicyMode::Denylist,
            denylists,
            allowlists: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_validates() {
        let config = ToolPolicyConfig::default();
        assert!(config.validate(&OperationRegistry::with_defaults()).is_ok());
        assert_eq!(config.mode, PolicyMode::Denylist);
    }

    #[test]
    fn test_default_policy_restricts_public_most() {
        let config = ToolPolicyConfig::default();
        let public = config.denylist(Role::Public).len();
        for role in [Role::Support, Role::Purchasing, Role::Internal] {
            assert!(config.denylist(role).len() <= public);
        }
        assert!(config.denylist(Role::Superadmin).is_empty());
    }

    #[test]
    fn test_validate_rejects_unregistered_denylist_entry() {
        let mut config = ToolPolicyConfig::empty(PolicyMode::Denylist);
        config.deny(Role::Support, "shell_exce");
        assert!(config.validate(&OperationRegistry::with_defaults()).is_err());
    }

    #[test]
    fn test_validate_rejects_unregistered_allowlist_entry() {
        let mut config = ToolPolicyConfig::empty(PolicyMode::Allowlist);
        config.allow(Role::Internal, "made_up");
        assert!(config.validate(&OperationRegistry::with_defaults()).is_err());
    }

    #[test]
    fn test_partial_section_keeps_default_denylists() {
        let config: ToolPolicyConfig = serde_json::from_str(r#"{"mode":"denylist"}"#).unwrap();
        assert_eq!(config, ToolPolicyConfig::default());
        assert!(config.denylist(Role::Public).iter().any(|op| op == "shell_exec"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = serde_json::from_str::<ToolPolicyConfig>(r#"{"denylist":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serialization_round_trip_keeps_roles() {
        let mut config = ToolPolicyConfig::empty(PolicyMode::Allowlist);
        config.allow(Role::Purchasing, "purchase_order");

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"purchasing\""));

        let restored: ToolPolicyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
