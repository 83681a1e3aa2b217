//! Authorization decisions

use serde::Serialize;

use rootguard_permissions::Role;

/// Outcome of [`crate::AccessGuard::authorize`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    /// Run the operation now
    Allowed { role: Role },
    /// The role may never run this operation
    Denied { role: Role },
    /// Critical operation waiting on the approver
    ApprovalRequired { role: Role, request_id: String },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed { .. })
    }

    pub fn role(&self) -> Role {
        match self {
            AccessDecision::Allowed { role }
            | AccessDecision::Denied { role }
            | AccessDecision::ApprovalRequired { role, .. } => *role,
        }
    }
}
