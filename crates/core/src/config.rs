//! Configuration management
//!
//! This module handles loading, saving, and migrating the osskit configuration file.
//! The configuration file is stored in TOML format at ~/.config/osskit/config.toml
//! and holds one `[storages.<name>]` table per logical storage.
//!
//! PROTECTED FILE: Changes to schema_version require migration support.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Current configuration schema version
///
/// IMPORTANT: Bumping this version requires:
/// 1. Adding a migration in `ConfigManager::migrate`
/// 2. Updating migration tests
/// 3. Marking the change as BREAKING
pub const SCHEMA_VERSION: u32 = 1;

/// Region used when a configuration leaves it empty
pub const DEFAULT_REGION: &str = "us-east-1";

/// Environment variable that overrides the configuration directory
pub const CONFIG_DIR_ENV: &str = "OSSKIT_CONFIG_DIR";

/// Connection settings for one logical storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider identifier, resolved through the registry (e.g. "minio", "aliyun")
    pub provider: String,

    /// Service endpoint, with or without scheme
    #[serde(default)]
    pub endpoint: String,

    /// Access key ID
    #[serde(default)]
    pub access_key: String,

    /// Secret access key
    #[serde(default)]
    pub secret_key: String,

    /// Region; empty means [`DEFAULT_REGION`]
    #[serde(default = "default_region")]
    pub region: String,

    /// Use HTTPS for endpoints given without a scheme and for static URLs
    #[serde(default = "default_true")]
    pub use_https: bool,

    /// Tencent COS application id, appended to bucket names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_true() -> bool {
    true
}

impl StorageConfig {
    /// Create a new storage configuration with required fields
    pub fn new(
        provider: impl Into<String>,
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: default_region(),
            use_https: true,
            app_id: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_https(mut self, use_https: bool) -> Self {
        self.use_https = use_https;
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Region with the empty string mapped to the default
    pub fn effective_region(&self) -> &str {
        if self.region.trim().is_empty() {
            DEFAULT_REGION
        } else {
            &self.region
        }
    }

    /// URL scheme implied by `use_https`
    pub fn scheme(&self) -> &'static str {
        if self.use_https { "https" } else { "http" }
    }

    /// Endpoint as a full URL, or `None` when no endpoint is configured
    pub fn endpoint_url(&self) -> Option<String> {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            None
        } else if endpoint.contains("://") {
            Some(endpoint.to_string())
        } else {
            Some(format!("{}://{endpoint}", self.scheme()))
        }
    }

    /// Endpoint host without scheme or trailing slash
    pub fn endpoint_host(&self) -> &str {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        match endpoint.split_once("://") {
            Some((_, host)) => host,
            None => endpoint,
        }
    }

    /// Fail fast when credentials are missing
    pub fn require_credentials(&self) -> Result<()> {
        if self.access_key.trim().is_empty() {
            return Err(Error::Validation("access key cannot be empty".into()));
        }
        if self.secret_key.trim().is_empty() {
            return Err(Error::Validation("secret key cannot be empty".into()));
        }
        Ok(())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Configured storages keyed by name
    #[serde(default)]
    pub storages: BTreeMap<String, StorageConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            storages: BTreeMap::new(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    ///
    /// `OSSKIT_CONFIG_DIR` takes precedence over the platform config directory.
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| {
                    Error::Configuration("Could not determine config directory".into())
                })?
                .join("osskit"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Configuration(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade osskit.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 600 (owner read/write only).
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        // Credentials live in this file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, config: Config) -> Result<Config> {
        let mut config = config;
        tracing::debug!(
            from = config.schema_version,
            to = SCHEMA_VERSION,
            "Migrating configuration"
        );
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert!(config.storages.is_empty());
    }

    #[test]
    fn test_storage_config_defaults() {
        let config = StorageConfig::new("minio", "localhost:9000", "ak", "sk");
        assert_eq!(config.region, "us-east-1");
        assert!(config.use_https);
        assert!(config.app_id.is_none());
    }

    #[test]
    fn test_empty_region_falls_back_to_default() {
        let config = StorageConfig::new("aliyun", "", "ak", "sk").with_region("");
        assert_eq!(config.effective_region(), DEFAULT_REGION);

        let config = config.with_region("oss-cn-hangzhou");
        assert_eq!(config.effective_region(), "oss-cn-hangzhou");
    }

    #[test]
    fn test_endpoint_url() {
        let config = StorageConfig::new("minio", "localhost:9000/", "ak", "sk");
        assert_eq!(
            config.endpoint_url().as_deref(),
            Some("https://localhost:9000")
        );
        assert_eq!(config.endpoint_host(), "localhost:9000");

        let config = config.with_https(false);
        assert_eq!(
            config.endpoint_url().as_deref(),
            Some("http://localhost:9000")
        );

        let config = StorageConfig::new("minio", "http://127.0.0.1:9000", "ak", "sk");
        assert_eq!(
            config.endpoint_url().as_deref(),
            Some("http://127.0.0.1:9000")
        );
        assert_eq!(config.endpoint_host(), "127.0.0.1:9000");

        let config = StorageConfig::new("s3", "", "ak", "sk");
        assert!(config.endpoint_url().is_none());
    }

    #[test]
    fn test_require_credentials() {
        assert!(
            StorageConfig::new("s3", "", "ak", "sk")
                .require_credentials()
                .is_ok()
        );

        let err = StorageConfig::new("s3", "", "", "sk")
            .require_credentials()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("access key"));

        let err = StorageConfig::new("s3", "", "ak", " ")
            .require_credentials()
            .unwrap_err();
        assert!(err.to_string().contains("secret key"));
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let (manager, _temp_dir) = temp_config_manager();

        let mut config = Config::default();
        config.storages.insert(
            "default".to_string(),
            StorageConfig::new("qcloud", "", "ak", "sk")
                .with_region("ap-guangzhou")
                .with_app_id("1250000000"),
        );

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.storages.len(), 1);
        let storage = &loaded.storages["default"];
        assert_eq!(storage.provider, "qcloud");
        assert_eq!(storage.region, "ap-guangzhou");
        assert_eq!(storage.app_id.as_deref(), Some("1250000000"));
    }

    #[test]
    fn test_load_applies_field_defaults() {
        let (manager, _temp_dir) = temp_config_manager();
        let content = r#"
            schema_version = 1

            [storages.local]
            provider = "minio"
            endpoint = "localhost:9000"
            access_key = "minioadmin"
            secret_key = "minioadmin"
        "#;
        std::fs::write(manager.config_path(), content).unwrap();

        let config = manager.load().unwrap();
        let storage = &config.storages["local"];
        assert_eq!(storage.region, DEFAULT_REGION);
        assert!(storage.use_https);
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();

        let content = format!(
            r#"
            schema_version = {}
            "#,
            SCHEMA_VERSION + 1
        );
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("newer than supported")
        );
    }

    #[test]
    fn test_schema_version_older_is_migrated() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(manager.config_path(), "schema_version = 0\n").unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
    }
}
