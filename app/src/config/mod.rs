mod storage;

pub use storage::StorageConfig;

use kit::Config;

/// Register all application configs
pub fn register_all() {
    Config::register(StorageConfig::from_env());
}
