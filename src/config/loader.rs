use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::system::FileSystemInterface;

use super::types::Config;

/// Configuration loader that uses dependency injection for file system operations
pub struct ConfigLoader<F: FileSystemInterface> {
    file_system: F,
    config_path: PathBuf,
}

impl<F: FileSystemInterface> ConfigLoader<F> {
    pub fn new(file_system: F, config_path: PathBuf) -> Self {
        Self {
            file_system,
            config_path,
        }
    }

    /// Load configuration, writing a default file first if none exists
    pub fn load_config(&self) -> Result<Config> {
        debug!("Loading configuration from: {}", self.config_path.display());

        if !self.file_system.config_file_exists(&self.config_path) {
            info!("Configuration file not found, creating default configuration");
            return self.create_default_config();
        }

        let config = self.read_existing()?;
        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate the file without creating a default one
    pub fn check_config(&self) -> Result<Config> {
        let config = self.read_existing()?;
        config.validate().with_context(|| {
            format!("Invalid configuration in {}", self.config_path.display())
        })?;
        Ok(config)
    }

    pub fn save_config(&self, config: &Config) -> Result<()> {
        debug!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            self.file_system
                .create_config_dir(parent)
                .with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
        }

        let config_content =
            toml::to_string_pretty(config).context("Failed to serialize configuration")?;

        self.file_system
            .write_config_file(&self.config_path, &config_content)
            .with_context(|| {
                format!(
                    "Failed to write configuration file: {}",
                    self.config_path.display()
                )
            })?;

        info!("Configuration saved to: {}", self.config_path.display());
        Ok(())
    }

    /// Re-read the file after SIGHUP
    pub fn reload_config(&self) -> Result<Config> {
        debug!("Reloading configuration");
        self.load_config()
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    fn read_existing(&self) -> Result<Config> {
        let config_content = self
            .file_system
            .read_config_file(&self.config_path)
            .with_context(|| {
                format!(
                    "Failed to read configuration file: {}",
                    self.config_path.display()
                )
            })?;

        toml::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse configuration file: {}",
                self.config_path.display()
            )
        })
    }

    fn create_default_config(&self) -> Result<Config> {
        let config = Config::default();

        // A read-only home directory still gets a working daemon
        if let Err(e) = self.save_config(&config) {
            warn!(
                "Could not save default config to {}: {}. Using default config.",
                self.config_path.display(),
                e
            );
            return Ok(config);
        }

        info!(
            "Created default configuration file: {}",
            self.config_path.display()
        );
        Ok(config)
    }
}

impl ConfigLoader<crate::system::StandardFileSystem> {
    pub fn new_production(config_path: PathBuf) -> Self {
        Self::new(crate::system::StandardFileSystem, config_path)
    }

    pub fn new_with_default_path() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self::new_production(config_path))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home_dir.join(".config/glued/config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockFileSystem;

    fn config_path() -> PathBuf {
        PathBuf::from("/test/glued/config.toml")
    }

    #[test]
    fn test_load_nonexistent_config_creates_default() {
        let mock_fs = MockFileSystem::new();
        let loader = ConfigLoader::new(mock_fs.clone(), config_path());

        let config = loader.load_config().unwrap();

        assert_eq!(config, Config::default());
        assert!(mock_fs.file_exists(config_path()));
        assert_eq!(
            mock_fs.get_directory_creation_calls(),
            vec![PathBuf::from("/test/glued")]
        );
    }

    #[test]
    fn test_unwritable_default_still_loads() {
        let mock_fs = MockFileSystem::new();
        mock_fs.set_create_dir_failure(true);
        let loader = ConfigLoader::new(mock_fs.clone(), config_path());

        let config = loader.load_config().unwrap();

        assert_eq!(config, Config::default());
        assert!(mock_fs.get_write_calls().is_empty());
    }

    #[test]
    fn test_load_existing_config() {
        let mock_fs = MockFileSystem::new();
        mock_fs.add_file(
            config_path(),
            r#"
[general]
log_level = "debug"

[monitor]
seed_running_state = true

[wireless]
blueutil_path = "/usr/local/bin/blueutil"

[notifications]
show_switch_results = false
show_failures = true
"#
            .to_string(),
        );

        let loader = ConfigLoader::new(mock_fs, config_path());
        let config = loader.load_config().unwrap();

        assert_eq!(config.general.log_level, "debug");
        assert!(config.monitor.seed_running_state);
        assert_eq!(
            config.wireless.blueutil_path,
            PathBuf::from("/usr/local/bin/blueutil")
        );
        assert!(!config.notifications.show_switch_results);
        assert!(config.notifications.show_failures);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let mock_fs = MockFileSystem::new();
        mock_fs.add_file(config_path(), "[general\nlog_level = ".to_string());

        let loader = ConfigLoader::new(mock_fs, config_path());
        let err = loader.load_config().unwrap_err();

        assert!(format!("{:#}", err).contains("Failed to parse configuration file"));
    }

    #[test]
    fn test_check_config_does_not_create_file() {
        let mock_fs = MockFileSystem::new();
        let loader = ConfigLoader::new(mock_fs.clone(), config_path());

        assert!(loader.check_config().is_err());
        assert!(!mock_fs.file_exists(config_path()));
    }

    #[test]
    fn test_check_config_validates_values() {
        let mock_fs = MockFileSystem::new();
        mock_fs.add_file(
            config_path(),
            "[general]\nlog_level = \"chatty\"\n".to_string(),
        );

        let loader = ConfigLoader::new(mock_fs, config_path());
        assert!(loader.load_config().is_ok());
        assert!(loader.check_config().is_err());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let mock_fs = MockFileSystem::new();
        let loader = ConfigLoader::new(mock_fs.clone(), config_path());

        let mut config = Config::default();
        config.monitor.seed_running_state = true;
        loader.save_config(&config).unwrap();

        assert_eq!(loader.reload_config().unwrap(), config);
        assert!(mock_fs.file_exists(config_path()));
    }
}
