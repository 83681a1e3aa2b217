//! # RootGuard Common
//!
//! Shared building blocks for the rootguard crates:
//! - An injectable [`Clock`] so expiry logic is deterministic under test
//! - JSON record-set persistence with atomic writes
//! - `tracing` subscriber initialisation

pub mod clock;
pub mod json_store;
pub mod logging;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use json_store::{load_json_or_default, save_json_atomic, JsonStoreError, JsonStoreResult};
pub use logging::{init, LogLevel, LogOptions};
