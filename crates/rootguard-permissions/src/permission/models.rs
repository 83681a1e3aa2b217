//! Tool policy data models

use serde::{Deserialize, Serialize};

/// How operations missing from a role's lists are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Anything not denylisted is allowed
    #[default]
    Denylist,
    /// Only allowlisted operations that are not also denylisted are allowed
    Allowlist,
}

impl std::fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyMode::Denylist => write!(f, "denylist"),
            PolicyMode::Allowlist => write!(f, "allowlist"),
        }
    }
}

/// Outcome of a tool access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolDecision {
    /// The role bypasses filtering
    Blanket,
    /// Allowed by policy
    Allow,
    /// Denied by policy
    Deny,
}

impl ToolDecision {
    /// Whether the operation may run
    pub fn is_allowed(&self) -> bool {
        !matches!(self, ToolDecision::Deny)
    }
}

impl std::fmt::Display for ToolDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolDecision::Blanket => write!(f, "blanket"),
            ToolDecision::Allow => write!(f, "allow"),
            ToolDecision::Deny => write!(f, "deny"),
        }
    }
}
