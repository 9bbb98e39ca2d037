//! Layered configuration for the inference mesh.
//!
//! Precedence, highest to lowest:
//! 1. Explicit file passed to [`ConfigLoader::with_file`]
//! 2. Environment variables prefixed `MESH_`
//! 3. Default config file (`~/.config/inference-mesh/config.toml`)
//! 4. Built-in defaults ([`Config::default`])
//!
//! # Examples
//!
//! ```no_run
//! use inference_mesh_core::config::ConfigLoader;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ConfigLoader::new().load()?;
//! # Ok(())
//! # }
//! ```

pub mod models;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde_valid::Validate;
use std::path::{Path, PathBuf};

pub use models::{
    AuthSettings, Config, DatabaseSettings, HybridRouterSettings, ObservabilitySettings,
    ProviderSettings, QueueSettings, SecuritySettings,
};

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = "inference-mesh";

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "MESH";

/// Separator for nested configuration keys, e.g.
/// `MESH_DATABASE__TIMEOUT_MS`.
const ENV_SEPARATOR: &str = "__";

/// Builder-pattern configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    custom_file: Option<PathBuf>,
    skip_default_file: bool,
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a loader with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `path` instead of the default config file location.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.custom_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Skips the default config file lookup. Useful for tests.
    pub fn skip_default_file(mut self) -> Self {
        self.skip_default_file = true;
        self
    }

    /// Skips environment variable overrides. Useful for tests.
    pub fn skip_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads and validates configuration from all enabled sources.
    pub fn load(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::builder();

        let defaults = Config::default();
        let defaults_value = config_to_value(&defaults)?;
        builder = builder.add_source(config::Config::try_from(&defaults_value)?);

        if !self.skip_default_file {
            if let Some(config_path) = self.find_config_file() {
                tracing::debug!(path = %config_path.display(), "loading config file");
                builder = builder.add_source(
                    File::from(config_path)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            } else {
                tracing::debug!("no default config file found");
            }
        }

        if let Some(ref custom_path) = self.custom_file {
            tracing::info!(path = %custom_path.display(), "loading custom config file");
            builder = builder.add_source(
                File::from(custom_path.as_ref())
                    .required(true)
                    .format(config::FileFormat::Toml),
            );
        }

        if !self.skip_env {
            tracing::debug!("applying environment variable overrides");
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .with_list_parse_key("security.trusted_keys")
                    .with_list_parse_key("auth.admin_tokens")
                    .with_list_parse_key("auth.operator_tokens")
                    .with_list_parse_key("auth.viewer_tokens")
                    .list_separator(","),
            );
        }

        let built = builder.build().context("failed to build configuration")?;
        let config: Config = built
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("configuration validation failed: {e}"))?;

        tracing::info!("configuration loaded");
        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if path.exists() {
                return Some(path);
            }
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        None
    }

    /// The platform-specific directory the default config file lives in.
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
    }

    /// The full path to the default config file, whether or not it
    /// exists yet.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
    }
}

fn config_to_value(config: &Config) -> Result<serde_json::Value, ConfigError> {
    serde_json::to_value(config).map_err(|e| ConfigError::Foreign(Box::new(e)))
}

/// Writes a default configuration file to the standard location.
/// Refuses to overwrite an existing file.
pub fn init_config_file() -> Result<PathBuf> {
    let config_dir =
        ConfigLoader::default_config_dir().context("could not determine config directory")?;
    std::fs::create_dir_all(&config_dir).context("failed to create config directory")?;

    let config_path = config_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        anyhow::bail!("config file already exists at: {}", config_path.display());
    }

    let toml_content =
        toml::to_string_pretty(&Config::default()).context("failed to serialize default config")?;
    std::fs::write(&config_path, toml_content).context("failed to write config file")?;

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let config = ConfigLoader::new()
            .skip_default_file()
            .skip_env()
            .load()
            .expect("default config should load");
        assert_eq!(config.queue.jobs_queue_name, "jobs");
        assert_eq!(config.database.timeout_ms, 30_000);
    }

    #[test]
    fn test_load_from_custom_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("mesh.toml");
        std::fs::write(
            &config_path,
            r#"
[database]
url = "postgres://custom/db"
pool_size = 20
timeout_ms = 5000

[queue]
url = "redis://custom:6379"
jobs_queue_name = "custom-jobs"
"#,
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(&config_path)
            .skip_env()
            .load()
            .expect("custom config should load");

        assert_eq!(config.database.url, "postgres://custom/db");
        assert_eq!(config.database.pool_size, 20);
        assert_eq!(config.queue.jobs_queue_name, "custom-jobs");
    }

    #[test]
    fn test_environment_variable_override() {
        env::set_var("MESH_DATABASE__TIMEOUT_MS", "15000");
        env::set_var("MESH_QUEUE__JOBS_QUEUE_NAME", "env-jobs");

        let config = ConfigLoader::new()
            .skip_default_file()
            .load()
            .expect("config with env overrides should load");

        assert_eq!(config.database.timeout_ms, 15000);
        assert_eq!(config.queue.jobs_queue_name, "env-jobs");

        env::remove_var("MESH_DATABASE__TIMEOUT_MS");
        env::remove_var("MESH_QUEUE__JOBS_QUEUE_NAME");
    }

    #[test]
    fn test_precedence_env_over_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("mesh.toml");
        std::fs::write(
            &config_path,
            r#"
[database]
timeout_ms = 5000
"#,
        )
        .unwrap();

        env::set_var("MESH_DATABASE__TIMEOUT_MS", "9000");
        let config = ConfigLoader::new()
            .with_file(&config_path)
            .load()
            .expect("config should load");
        assert_eq!(config.database.timeout_ms, 9000);
        env::remove_var("MESH_DATABASE__TIMEOUT_MS");
    }

    #[test]
    fn test_validation_failure_timeout_too_low() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(
            &config_path,
            r#"
[database]
timeout_ms = 10
"#,
        )
        .unwrap();

        let result = ConfigLoader::new().with_file(&config_path).skip_env().load();
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_dir_contains_project_name() {
        let dir = ConfigLoader::default_config_dir();
        assert!(dir.is_some());
        assert!(dir
            .unwrap()
            .to_string_lossy()
            .contains("inference-mesh"));
    }
}
