use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context with an app data directory and a firmware resource
/// directory under one temporary root. Cleans up when dropped.
pub struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory used for settings, caches and snapshots
    pub fn app_data_dir(&self) -> PathBuf {
        self.root().join("app-data")
    }

    /// Directory bundled firmware files are read from
    pub fn resource_dir(&self) -> PathBuf {
        self.root().join("resources")
    }

    /// Write a firmware file into the resource directory
    pub fn create_firmware(&self, name: &str, content: &[u8]) -> PathBuf {
        let dir = self.resource_dir();
        fs::create_dir_all(&dir).expect("Failed to create resource dir");
        let path = dir.join(name);
        fs::write(&path, content).expect("Failed to write firmware file");
        path
    }

    /// Write a text file relative to the app data directory
    pub fn create_app_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let path = self.app_data_dir().join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn read_app_file(&self, relative_path: &str) -> String {
        fs::read_to_string(self.app_data_dir().join(relative_path)).expect("Failed to read file")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
