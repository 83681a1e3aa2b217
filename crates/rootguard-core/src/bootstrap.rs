//! Process startup

use std::sync::Arc;

use tracing::{error, warn};

use rootguard_common::{LogLevel, LogOptions, SystemClock};
use rootguard_config::ConfigManager;
use rootguard_rootauth::OutOfBandNotifier;

use crate::error::Result;
use crate::guard::{AccessGuard, GuardOptions};

/// Load configuration, install logging and build a persistent guard.
///
/// The master secret is read from the environment variable named by
/// `store.master_secret_env`; without it secret storage stays disabled.
/// Crypto and store-format failures are logged as fatal and returned.
pub fn bootstrap(
    manager: &ConfigManager,
    notifier: Arc<dyn OutOfBandNotifier>,
) -> Result<AccessGuard> {
    let (config, _registry) = manager.load_config()?;

    let level = LogLevel::parse(&config.logging.level).unwrap_or(LogLevel::Info);
    rootguard_common::init(LogOptions {
        level,
        with_target: config.logging.with_target,
    });

    let master_secret = std::env::var(&config.store.master_secret_env)
        .ok()
        .filter(|secret| !secret.is_empty())
        .map(String::into_bytes);
    if master_secret.is_none() {
        warn!(
            var = %config.store.master_secret_env,
            "Master secret not set, secret storage disabled"
        );
    }

    let options = GuardOptions {
        notifier,
        clock: SystemClock::shared(),
        store_path: Some(config.store.resolved_path()),
        master_secret,
    };

    AccessGuard::new(config, options).map_err(|e| {
        if e.is_fatal() {
            error!(error = %e, "Fatal startup error");
        }
        e
    })
}
