use kit::env;
use std::path::PathBuf;

/// Where accepted uploads are kept
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for stored files
    pub root: PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            root: env("STORAGE_ROOT", PathBuf::from("storage")),
        }
    }

    /// Directory avatars are moved into
    pub fn avatars(&self) -> PathBuf {
        self.root.join("avatars")
    }
}
