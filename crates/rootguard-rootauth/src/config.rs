//! Root authorization settings

use chrono::Duration;
use serde::{Deserialize, Serialize};

use rootguard_permissions::OperationRegistry;

use crate::error::{Result, RootAuthError};

/// Settings for the approval flow.
///
/// Field names also accept the camelCase spelling used by external
/// configuration providers (`criticalOperations`, `requestExpiryMinutes`, ...),
/// including its lowercased form. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RootAuthConfig {
    /// Whether critical operations are gated at all
    pub enabled: bool,
    /// Operations that need an approval before every use
    #[serde(alias = "criticalOperations", alias = "criticaloperations")]
    pub critical_operations: Vec<String>,
    /// Lifetime of a pending request
    #[serde(alias = "requestExpiryMinutes", alias = "requestexpiryminutes")]
    pub request_expiry_minutes: u32,
    /// How long resolved requests are kept for audit
    #[serde(alias = "auditRetentionMinutes", alias = "auditretentionminutes")]
    pub audit_retention_minutes: u32,
    /// Recipient of approval notifications
    #[serde(alias = "approverId", alias = "approverid")]
    pub approver_id: Option<String>,
    /// Digits in the confirmation code
    #[serde(alias = "codeLength", alias = "codelength")]
    pub code_length: usize,
    /// Wrong codes tolerated before a request is denied
    #[serde(alias = "maxCodeAttempts", alias = "maxcodeattempts")]
    pub max_code_attempts: u32,
}

fn default_expiry_minutes() -> u32 {
    10
}

fn default_retention_minutes() -> u32 {
    24 * 60
}

fn default_code_length() -> usize {
    6
}

fn default_max_code_attempts() -> u32 {
    5
}

impl Default for RootAuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            critical_operations: Vec::new(),
            request_expiry_minutes: default_expiry_minutes(),
            audit_retention_minutes: default_retention_minutes(),
            approver_id: None,
            code_length: default_code_length(),
            max_code_attempts: default_max_code_attempts(),
        }
    }
}

impl RootAuthConfig {
    /// Enabled configuration gating the given operations
    pub fn enabled_for<I, S>(operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            critical_operations: operations.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Whether `operation` needs approval
    pub fn is_critical(&self, operation: &str) -> bool {
        self.critical_operations.iter().any(|op| op == operation)
    }

    /// Lifetime of a pending request
    pub fn request_ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.request_expiry_minutes))
    }

    /// Retention window for resolved requests
    pub fn retention(&self) -> Duration {
        Duration::minutes(i64::from(self.audit_retention_minutes))
    }

    /// Check bounds and that every critical operation is registered
    pub fn validate(&self, registry: &OperationRegistry) -> Result<()> {
        if self.request_expiry_minutes == 0 {
            return Err(RootAuthError::Config(
                "request_expiry_minutes must be greater than 0".to_string(),
            ));
        }
        if !(4..=12).contains(&self.code_length) {
            return Err(RootAuthError::Config(format!(
                "code_length must be between 4 and 12, got {}",
                self.code_length
            )));
        }
        if self.max_code_attempts == 0 {
            return Err(RootAuthError::Config(
                "max_code_attempts must be greater than 0".to_string(),
            ));
        }
        registry.validate_all(&self.critical_operations, "critical_operations")?;
        Ok(())
    }
}
