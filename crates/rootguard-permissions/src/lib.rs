//! Permissions System for RootGuard
//!
//! Resolves a fixed trust [`Role`] per channel and decides which operations
//! each role may invoke. Operation names are validated against an
//! [`OperationRegistry`] at construction so a typo in policy configuration
//! is a startup error instead of a silent bypass.

pub mod error;
pub mod permission;
pub mod registry;
pub mod role;

pub use error::{Error, Result};
pub use permission::{PolicyMode, ToolAccessFilter, ToolDecision, ToolPolicyConfig};
pub use registry::{OperationRegistry, BUILTIN_SENSITIVE_OPERATIONS};
pub use role::{Role, RoleConfig, RoleResolver};
