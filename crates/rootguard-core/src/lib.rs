//! # RootGuard Core
//!
//! [`AccessGuard`] is the single entry point for hosts: it resolves the
//! caller's role, applies the tool policy, gates critical operations behind
//! out-of-band approval and manages the administrator's own sessions.
//!
//! State that must survive a restart lives in a [`GuardStore`], loaded when
//! the guard is built and written back by [`AccessGuard::flush`].

pub mod bootstrap;
pub mod decision;
pub mod error;
pub mod guard;
pub mod store;

pub use bootstrap::bootstrap;
pub use decision::AccessDecision;
pub use error::{GuardError, Result};
pub use guard::{AccessGuard, GuardOptions};
pub use store::{GuardStore, StoreRecords, STORE_VERSION};
