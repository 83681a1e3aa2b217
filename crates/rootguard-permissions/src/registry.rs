//! Registry of known sensitive operations

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Operations that are always registered as sensitive
pub const BUILTIN_SENSITIVE_OPERATIONS: &[&str] = &[
    "file_write",
    "file_delete",
    "shell_exec",
    "process_kill",
    "db_write",
    "db_drop",
    "send_email",
    "send_message",
    "http_request",
    "payment_create",
    "purchase_order",
    "config_update",
    "user_manage",
    "credential_rotate",
    "deploy",
    "package_install",
];

/// Set of operation names that policy configuration may refer to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRegistry {
    sensitive: BTreeSet<String>,
}

impl OperationRegistry {
    /// Registry holding only the built-in sensitive operations
    pub fn with_defaults() -> Self {
        Self {
            sensitive: BUILTIN_SENSITIVE_OPERATIONS
                .iter()
                .map(|op| op.to_string())
                .collect(),
        }
    }

    /// Empty registry
    pub fn empty() -> Self {
        Self {
            sensitive: BTreeSet::new(),
        }
    }

    /// Register an additional sensitive operation
    pub fn register(&mut self, operation: impl Into<String>) -> Result<()> {
        let operation = operation.into();
        if operation.trim().is_empty() || operation.chars().any(char::is_whitespace) {
            return Err(Error::ConfigError(format!(
                "Invalid operation name: '{}'",
                operation
            )));
        }
        self.sensitive.insert(operation);
        Ok(())
    }

    /// Register several operations
    pub fn extend<I, S>(&mut self, operations: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for operation in operations {
            self.register(operation)?;
        }
        Ok(())
    }

    /// Whether `operation` is registered
    pub fn is_sensitive(&self, operation: &str) -> bool {
        self.sensitive.contains(operation)
    }

    /// Fail with [`Error::UnknownOperation`] if any entry is unregistered
    pub fn validate_all<'a, I>(&self, operations: I, context: &str) -> Result<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        for operation in operations {
            if !self.is_sensitive(operation) {
                return Err(Error::UnknownOperation {
                    operation: operation.clone(),
                    context: context.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Registered operations in sorted order
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.sensitive.iter().map(String::as_str)
    }

    /// Number of registered operations
    pub fn len(&self) -> usize {
        self.sensitive.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sensitive.is_empty()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
