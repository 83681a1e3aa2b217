//! Root authorization data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    /// Waiting for the approver
    Pending,
    /// Approved and not yet used
    Approved,
    /// Rejected by the approver
    Denied,
    /// Not resolved before its deadline
    Expired,
    /// Approval spent by one execution
    Consumed,
}

impl RequestStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Denied | RequestStatus::Expired | RequestStatus::Consumed
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "PENDING"),
            RequestStatus::Approved => write!(f, "APPROVED"),
            RequestStatus::Denied => write!(f, "DENIED"),
            RequestStatus::Expired => write!(f, "EXPIRED"),
            RequestStatus::Consumed => write!(f, "CONSUMED"),
        }
    }
}

/// Outcome of the out-of-band notification for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Dispatch in flight
    Pending,
    /// Accepted by the notification channel
    Delivered {
        at: DateTime<Utc>,
        message_id: Option<String>,
    },
    /// Could not be delivered
    Failed { reason: String },
}

/// Approval ticket for one critical operation attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootAuthRequest {
    pub id: String,
    pub operation: String,
    pub reason: String,
    pub requester_id: String,
    pub requester_channel: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    /// When the request left `PENDING`
    pub resolved_at: Option<DateTime<Utc>>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub notification: NotificationStatus,
    /// SHA-256 of the confirmation code
    pub code_hash: String,
    #[serde(default)]
    pub failed_code_attempts: u32,
}

impl RootAuthRequest {
    /// Deadline has been reached. The boundary instant counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Approved, unspent and still inside its deadline
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == RequestStatus::Approved && !self.is_expired_at(now)
    }

    /// When the request stopped being actionable, `None` while pending.
    ///
    /// An unspent approval settles at its deadline.
    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            RequestStatus::Pending => None,
            RequestStatus::Approved => Some(self.expires_at),
            RequestStatus::Consumed => self.consumed_at.or(self.resolved_at),
            RequestStatus::Denied | RequestStatus::Expired => self.resolved_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(now: DateTime<Utc>) -> RootAuthRequest {
        RootAuthRequest {
            id: "ab12cd34".to_string(),
            operation: "file_delete".to_string(),
            reason: "cleanup".to_string(),
            requester_id: "u1".to_string(),
            requester_channel: "telegram".to_string(),
            status: RequestStatus::Pending,
            created_at: now,
            expires_at: now + Duration::minutes(10),
            approved_at: None,
            resolved_at: None,
            consumed_at: None,
            notification: NotificationStatus::Pending,
            code_hash: String::new(),
            failed_code_attempts: 0,
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Denied.is_terminal());
        assert!(RequestStatus::Expired.is_terminal());
        assert!(RequestStatus::Consumed.is_terminal());
    }

    #[test]
    fn test_expiry_boundary_counts_as_expired() {
        let now = Utc::now();
        let req = request(now);
        assert!(!req.is_expired_at(now + Duration::minutes(10) - Duration::milliseconds(1)));
        assert!(req.is_expired_at(now + Duration::minutes(10)));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&RequestStatus::Consumed).unwrap(), "\"CONSUMED\"");
        assert_eq!(RequestStatus::Pending.to_string(), "PENDING");
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let json = serde_json::to_value(request(Utc::now())).unwrap();
        assert!(json.get("requesterId").is_some());
        assert!(json.get("expiresAt").is_some());
        assert_eq!(json["notification"]["state"], "pending");
    }
}
