//! Role × operation access decisions

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::Result;
use crate::permission::config::ToolPolicyConfig;
use crate::permission::models::{PolicyMode, ToolDecision};
use crate::registry::OperationRegistry;
use crate::role::Role;

/// Decides which operations a role may use.
///
/// Lists are copied into hash sets at construction, so every check is a
/// constant-time lookup.
#[derive(Debug, Clone)]
pub struct ToolAccessFilter {
    mode: PolicyMode,
    denied: HashMap<Role, HashSet<String>>,
    allowed: HashMap<Role, HashSet<String>>,
}

impl ToolAccessFilter {
    /// Build a filter, rejecting lists that name unregistered operations
    pub fn new(config: &ToolPolicyConfig, registry: &OperationRegistry) -> Result<Self> {
        config.validate(registry)?;

        let to_sets = |lists: &HashMap<Role, Vec<String>>| {
            lists
                .iter()
                .filter(|(role, _)| !role.has_blanket_authority())
                .map(|(role, ops)| (*role, ops.iter().cloned().collect::<HashSet<_>>()))
                .collect::<HashMap<_, _>>()
        };

        Ok(Self {
            mode: config.mode,
            denied: to_sets(&config.denylists),
            allowed: to_sets(&config.allowlists),
        })
    }

    /// Active policy mode
    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    /// Full decision for `role` invoking `operation`
    pub fn decide(&self, role: Role, operation: &str) -> ToolDecision {
        if role.has_blanket_authority() {
            return ToolDecision::Blanket;
        }

        let in_set = |sets: &HashMap<Role, HashSet<String>>| {
            sets.get(&role)
                .map(|set| set.contains(operation))
                .unwrap_or(false)
        };

        if in_set(&self.denied) {
            return ToolDecision::Deny;
        }

        match self.mode {
            PolicyMode::Denylist => ToolDecision::Allow,
            PolicyMode::Allowlist if in_set(&self.allowed) => ToolDecision::Allow,
            PolicyMode::Allowlist => ToolDecision::Deny,
        }
    }

    /// Whether `role` may use `operation`
    pub fn can_use(&self, role: Role, operation: &str) -> bool {
        let decision = self.decide(role, operation);
        if !decision.is_allowed() {
            debug!(%role, operation, mode = %self.mode, "Tool denied by policy");
        }
        decision.is_allowed()
    }

    /// Remove the operations `role` may not use, preserving order
    pub fn filter_tools<I, S>(&self, role: Role, operations: I) -> Vec<S>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        operations
            .into_iter()
            .filter(|op| self.decide(role, op.as_ref()).is_allowed())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn denylist_filter() -> ToolAccessFilter {
        let mut config = ToolPolicyConfig::empty(PolicyMode::Denylist);
        config
            .deny(Role::Support, "file_delete")
            .deny(Role::Support, "shell_exec")
            .deny(Role::Public, "file_write")
            .deny(Role::Superadmin, "file_delete");
        ToolAccessFilter::new(&config, &OperationRegistry::with_defaults()).unwrap()
    }

    #[test]
    fn test_superadmin_always_allowed() {
        let filter = denylist_filter();
        assert!(filter.can_use(Role::Superadmin, "file_delete"));
        assert!(filter.can_use(Role::Superadmin, "anything_at_all"));
        assert_eq!(filter.decide(Role::Superadmin, "shell_exec"), ToolDecision::Blanket);
    }

    #[test]
    fn test_denylisted_operation_is_denied() {
        let filter = denylist_filter();
        assert!(!filter.can_use(Role::Support, "file_delete"));
        assert!(!filter.can_use(Role::Support, "shell_exec"));
        assert!(!filter.can_use(Role::Public, "file_write"));
    }

    #[test]
    fn test_unlisted_operation_allowed_in_denylist_mode() {
        let filter = denylist_filter();
        assert!(filter.can_use(Role::Support, "file_write"));
        assert!(filter.can_use(Role::Internal, "db_drop"));
        assert!(filter.can_use(Role::Public, "weather_lookup"));
    }

    #[test]
    fn test_allowlist_mode_denies_unlisted() {
        let mut config = ToolPolicyConfig::empty(PolicyMode::Allowlist);
        config
            .allow(Role::Purchasing, "purchase_order")
            .allow(Role::Purchasing, "send_email")
            .deny(Role::Purchasing, "send_email");
        let filter = ToolAccessFilter::new(&config, &OperationRegistry::with_defaults()).unwrap();

        assert!(filter.can_use(Role::Purchasing, "purchase_order"));
        // Denylist wins over allowlist
        assert!(!filter.can_use(Role::Purchasing, "send_email"));
        assert!(!filter.can_use(Role::Purchasing, "file_write"));
        assert!(!filter.can_use(Role::Internal, "purchase_order"));
        assert!(filter.can_use(Role::Superadmin, "file_write"));
    }

    #[test]
    fn test_filter_tools_preserves_order() {
        let filter = denylist_filter();
        let ops = vec!["web_search", "file_delete", "file_write", "shell_exec", "calendar"];

        let visible = filter.filter_tools(Role::Support, ops.clone());
        assert_eq!(visible, vec!["web_search", "file_write", "calendar"]);

        let all = filter.filter_tools(Role::Superadmin, ops.clone());
        assert_eq!(all, ops);
    }

    #[test]
    fn test_filter_tools_owned_strings() {
        let filter = denylist_filter();
        let ops: Vec<String> = vec!["file_write".into(), "file_read".into()];
        assert_eq!(filter.filter_tools(Role::Public, ops), vec!["file_read".to_string()]);
    }

    #[test]
    fn test_construction_rejects_typos() {
        let mut config = ToolPolicyConfig::empty(PolicyMode::Denylist);
        config.deny(Role::Public, "fiel_delete");
        let result = ToolAccessFilter::new(&config, &OperationRegistry::with_defaults());
        assert!(matches!(result, Err(Error::UnknownOperation { .. })));
    }
}
