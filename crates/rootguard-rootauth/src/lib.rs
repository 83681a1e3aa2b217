//! # RootGuard Root Authorization
//!
//! Approval state machine for critical operations. A request starts
//! `PENDING`, is resolved exactly once to `APPROVED`, `DENIED` or `EXPIRED`,
//! and an approval is spent (`CONSUMED`) by the first operation that uses it.
//!
//! Opening a request dispatches a confirmation code to the approver through
//! an [`OutOfBandNotifier`]; dispatch never blocks or fails the caller.

pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod notifier;

pub use config::RootAuthConfig;
pub use error::{Result, RootAuthError};
pub use manager::RootAuthorizationManager;
pub use models::{NotificationStatus, RequestStatus, RootAuthRequest};
pub use notifier::{DeliveryReceipt, LogNotifier, NotifyError, OutOfBandNotifier};
