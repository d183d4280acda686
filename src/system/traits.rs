use anyhow::Result;
use std::path::Path;

/// Trait for file system operations - abstracts std::fs for testability
pub trait FileSystemInterface: Send + Sync {
    /// Read the entire contents of a configuration file
    fn read_config_file(&self, path: &Path) -> Result<String>;

    /// Write configuration content to a file
    fn write_config_file(&self, path: &Path, content: &str) -> Result<()>;

    /// Check if a configuration file exists
    fn config_file_exists(&self, path: &Path) -> bool;

    /// Create the directory structure for config files
    fn create_config_dir(&self, path: &Path) -> Result<()>;

    /// Delete a configuration file
    fn remove_config_file(&self, path: &Path) -> Result<()>;
}
