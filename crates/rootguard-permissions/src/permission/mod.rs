//! Role-based tool access

pub mod config;
pub mod filter;
pub mod models;

pub use config::ToolPolicyConfig;
pub use filter::ToolAccessFilter;
pub use models::{PolicyMode, ToolDecision};
