//! Profile management
//!
//! A profile is a named storage configuration persisted in the config file.
//! The registry resolves adapters by profile name.

use crate::config::{ConfigManager, StorageConfig};
use crate::error::{Error, Result};

/// A named storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub storage: StorageConfig,
}

/// Manager for profile operations
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    /// Create a new ProfileManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new ProfileManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    /// List all configured profiles, ordered by name
    pub fn list(&self) -> Result<Vec<Profile>> {
        let config = self.config_manager.load()?;
        Ok(config
            .storages
            .into_iter()
            .map(|(name, storage)| Profile { name, storage })
            .collect())
    }

    /// Get a profile's storage configuration by name
    pub fn get(&self, name: &str) -> Result<StorageConfig> {
        let mut config = self.config_manager.load()?;
        config
            .storages
            .remove(name)
            .ok_or_else(|| Error::Configuration(format!("no storage named '{name}'")))
    }

    /// Add or replace a profile
    pub fn set(&self, name: &str, storage: StorageConfig) -> Result<()> {
        if !is_valid_profile_name(name) {
            return Err(Error::Validation(format!(
                "invalid profile name '{name}': use letters, digits, '_' or '-'"
            )));
        }
        if storage.provider.trim().is_empty() {
            return Err(Error::Validation("provider cannot be empty".into()));
        }

        let mut config = self.config_manager.load()?;
        config.storages.insert(name.to_string(), storage);
        self.config_manager.save(&config)
    }

    /// Remove a profile
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        if config.storages.remove(name).is_none() {
            return Err(Error::Configuration(format!("no storage named '{name}'")));
        }
        self.config_manager.save(&config)
    }

    /// Check if a profile exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.storages.contains_key(name))
    }
}

/// Profile names double as the first segment of remote paths
pub fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
