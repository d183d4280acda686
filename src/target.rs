use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::system::FileSystemInterface;

/// The one wireless device the user chose to glue audio output to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDevice {
    /// Hardware address used to connect
    pub address: String,
    /// Audio output name used to switch
    pub name: String,
}

impl TargetDevice {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TargetDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Where the saved target lives. The switching engine only ever calls `load`.
pub trait TargetPreference: Send + Sync {
    fn load(&self) -> Option<TargetDevice>;
    fn save(&self, target: &TargetDevice) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct TargetFile {
    target: TargetDevice,
}

/// Target preference persisted as a small TOML file
pub struct FileTargetStore<F: FileSystemInterface> {
    file_system: F,
    path: PathBuf,
}

impl<F: FileSystemInterface> FileTargetStore<F> {
    pub fn new(file_system: F, path: PathBuf) -> Self {
        Self { file_system, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileTargetStore<crate::system::StandardFileSystem> {
    pub fn new_production(path: PathBuf) -> Self {
        Self::new(crate::system::StandardFileSystem, path)
    }

    pub fn default_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home_dir.join(".config/glued/target.toml"))
    }
}

impl<F: FileSystemInterface + Send + Sync> TargetPreference for FileTargetStore<F> {
    fn load(&self) -> Option<TargetDevice> {
        if !self.file_system.config_file_exists(&self.path) {
            debug!("No saved target at {}", self.path.display());
            return None;
        }

        let content = match self.file_system.read_config_file(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read saved target {}: {}", self.path.display(), e);
                return None;
            }
        };

        match toml::from_str::<TargetFile>(&content) {
            Ok(file) => Some(file.target),
            Err(e) => {
                warn!("Failed to decode saved target {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&self, target: &TargetDevice) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            self.file_system
                .create_config_dir(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(&TargetFile {
            target: target.clone(),
        })
        .context("Failed to serialize target device")?;

        self.file_system
            .write_config_file(&self.path, &content)
            .with_context(|| format!("Failed to write target: {}", self.path.display()))?;

        info!("Saved target device: {}", target);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if !self.file_system.config_file_exists(&self.path) {
            return Ok(());
        }

        self.file_system
            .remove_config_file(&self.path)
            .with_context(|| format!("Failed to remove target: {}", self.path.display()))?;

        info!("Cleared target device");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockFileSystem;

    fn store(fs: &MockFileSystem) -> FileTargetStore<MockFileSystem> {
        FileTargetStore::new(fs.clone(), PathBuf::from("/test/glued/target.toml"))
    }

    #[test]
    fn test_load_without_file_is_none() {
        let fs = MockFileSystem::new();
        assert_eq!(store(&fs).load(), None);
    }

    #[test]
    fn test_save_then_load() {
        let fs = MockFileSystem::new();
        let target = TargetDevice::new("11-22-33-44-55-66", "AirPods Pro");

        store(&fs).save(&target).unwrap();

        assert_eq!(store(&fs).load(), Some(target));
        assert_eq!(
            fs.get_directory_creation_calls(),
            vec![PathBuf::from("/test/glued")]
        );
    }

    #[test]
    fn test_corrupt_file_reads_as_none() {
        let fs = MockFileSystem::new();
        fs.add_file("/test/glued/target.toml", "[target]\naddress = 42\n".to_string());

        assert_eq!(store(&fs).load(), None);
    }

    #[test]
    fn test_clear_removes_target() {
        let fs = MockFileSystem::new();
        let store = store(&fs);
        store
            .save(&TargetDevice::new("11-22-33-44-55-66", "AirPods Pro"))
            .unwrap();

        store.clear().unwrap();

        assert_eq!(store.load(), None);
        assert!(!fs.file_exists("/test/glued/target.toml"));
        // Clearing twice is fine
        store.clear().unwrap();
    }
}
