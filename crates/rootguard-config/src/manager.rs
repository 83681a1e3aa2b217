//! Configuration manager implementation

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::{debug, info};

use rootguard_common::LogLevel;
use rootguard_permissions::OperationRegistry;

use crate::{
    error::{ConfigError, Result},
    types::GuardConfig,
};

/// Default environment prefix (`ROOTGUARD__ROOT_AUTH__ENABLED=true`)
pub const DEFAULT_ENV_PREFIX: &str = "ROOTGUARD";

/// Separator between prefix and nested keys in environment variables
const ENV_SEPARATOR: &str = "__";

/// Keys whose environment values are comma-separated lists
const LIST_KEYS: &[&str] = &["root_auth.critical_operations", "operations.sensitive"];

/// Configuration manager
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Configuration file path
    config_path: PathBuf,
    /// Environment prefix
    env_prefix: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Create with custom config path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get default config path
    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rootguard")
            .join("config.toml")
    }

    /// Load the file (if present) and environment overrides, then validate.
    ///
    /// Returns the operation registry built while validating.
    pub fn load_config(&self) -> Result<(GuardConfig, OperationRegistry)> {
        let mut environment = Environment::with_prefix(&self.env_prefix)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }

        let builder = Config::builder()
            .add_source(
                File::from(self.config_path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(environment);

        let config: GuardConfig = builder.build()?.try_deserialize()?;
        let registry = self.validate_config(&config)?;

        info!(
            path = %self.config_path.display(),
            root_auth = config.root_auth.enabled,
            critical = config.root_auth.critical_operations.len(),
            "Configuration loaded"
        );
        Ok((config, registry))
    }

    /// Write the configuration as TOML
    pub fn save_config(&self, config: &GuardConfig) -> Result<()> {
        let toml = toml::to_string_pretty(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, toml)?;
        debug!(path = %self.config_path.display(), "Configuration saved");
        Ok(())
    }

    /// Check every section against the operation registry and its own bounds
    pub fn validate_config(&self, config: &GuardConfig) -> Result<OperationRegistry> {
        let registry = config.registry()?;

        config.root_auth.validate(&registry)?;
        config.tool_policy.validate(&registry)?;
        config.vault.validate()?;
        config.vault.hashing.validate()?;

        if LogLevel::parse(&config.logging.level).is_none() {
            return Err(ConfigError::Validation(format!(
                "unknown log level '{}'",
                config.logging.level
            )));
        }
        if config.store.master_secret_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store.master_secret_env must not be empty".to_string(),
            ));
        }

        Ok(registry)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path() {
        let manager = ConfigManager::new();
        assert!(manager.config_path().ends_with("rootguard/config.toml"));
    }

    #[test]
    fn test_default_config_validates() {
        let manager = ConfigManager::new();
        let registry = manager.validate_config(&GuardConfig::default()).unwrap();
        assert!(registry.is_sensitive("shell_exec"));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = GuardConfig::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            ConfigManager::new().validate_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }
}
