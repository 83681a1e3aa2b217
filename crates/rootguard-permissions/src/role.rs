//! Trust roles and channel-to-role resolution

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Trust tier bound to a channel.
///
/// The set is closed: roles cannot be added at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owner of the deployment; bypasses tool restrictions
    Superadmin,
    /// Anyone not explicitly mapped
    Public,
    /// Customer support staff
    Support,
    /// Purchasing and procurement staff
    Purchasing,
    /// Internal team members
    Internal,
}

impl Role {
    /// Every role, in declaration order
    pub const ALL: [Role; 5] = [
        Role::Superadmin,
        Role::Public,
        Role::Support,
        Role::Purchasing,
        Role::Internal,
    ];

    /// Get role name
    pub fn name(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Public => "public",
            Role::Support => "support",
            Role::Purchasing => "purchasing",
            Role::Internal => "internal",
        }
    }

    /// Get role description
    pub fn description(&self) -> &'static str {
        match self {
            Role::Superadmin => "Deployment owner with unrestricted tool access",
            Role::Public => "Unmapped channel with the narrowest access",
            Role::Support => "Customer support with read-mostly access",
            Role::Purchasing => "Procurement with purchasing operations",
            Role::Internal => "Internal staff with broad operational access",
        }
    }

    /// Whether this role skips tool filtering entirely
    pub fn has_blanket_authority(&self) -> bool {
        matches!(self, Role::Superadmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.name() == lowered)
            .ok_or_else(|| Error::UnknownRole(s.to_string()))
    }
}

/// Channel-to-role overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    /// Channel identifier (matched case-insensitively) to role
    #[serde(default)]
    pub channels: HashMap<String, Role>,
}

impl RoleConfig {
    /// Map a channel to a role
    pub fn assign(&mut self, channel_id: impl Into<String>, role: Role) {
        self.channels.insert(channel_id.into(), role);
    }
}

/// Resolves the role for a channel identifier.
///
/// Unknown channels fall back to [`Role::Public`].
#[derive(Debug, Clone, Default)]
pub struct RoleResolver {
    overrides: HashMap<String, Role>,
}

impl RoleResolver {
    /// Fallback for unmapped channels
    pub const FALLBACK: Role = Role::Public;

    /// Build a resolver from configuration
    pub fn new(config: &RoleConfig) -> Self {
        let overrides = config
            .channels
            .iter()
            .map(|(channel, role)| (normalize(channel), *role))
            .collect();
        Self { overrides }
    }

    /// Resolve the role for a channel
    pub fn resolve(&self, channel_id: &str) -> Role {
        self.overrides
            .get(&normalize(channel_id))
            .copied()
            .unwrap_or(Self::FALLBACK)
    }

    /// Number of configured overrides
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Whether no overrides are configured
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

fn normalize(channel_id: &str) -> String {
    channel_id.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> RoleResolver {
        let mut config = RoleConfig::default();
        config.assign("telegram:1001", Role::Superadmin);
        config.assign("Slack:Support-Desk", Role::Support);
        config.assign("whatsapp:+15550100", Role::Purchasing);
        RoleResolver::new(&config)
    }

    #[test]
    fn test_resolve_configured_channel() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("telegram:1001"), Role::Superadmin);
        assert_eq!(resolver.resolve("whatsapp:+15550100"), Role::Purchasing);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("slack:support-desk"), Role::Support);
        assert_eq!(resolver.resolve("SLACK:SUPPORT-DESK"), Role::Support);
        assert_eq!(resolver.resolve("TELEGRAM:1001"), Role::Superadmin);
    }

    #[test]
    fn test_unknown_channel_falls_back_to_public() {
        assert_eq!(resolver().resolve("discord:stranger"), Role::Public);
        assert_eq!(RoleResolver::default().resolve(""), Role::Public);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("superadmin".parse::<Role>().unwrap(), Role::Superadmin);
        assert_eq!("Internal".parse::<Role>().unwrap(), Role::Internal);
        assert!(matches!("root".parse::<Role>(), Err(Error::UnknownRole(_))));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Purchasing).unwrap();
        assert_eq!(json, "\"purchasing\"");

        let role: Role = serde_json::from_str("\"support\"").unwrap();
        assert_eq!(role, Role::Support);
        assert!(serde_json::from_str::<Role>("\"owner\"").is_err());
    }

    #[test]
    fn test_only_superadmin_has_blanket_authority() {
        for role in Role::ALL {
            assert_eq!(role.has_blanket_authority(), role == Role::Superadmin);
        }
    }
}
