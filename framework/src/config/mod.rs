//! Configuration loading
//!
//! `.env` files are loaded with environment-based precedence, then typed
//! config structs are built from the environment and kept in a repository
//! keyed by type.
//!
//! # Example
//!
//! ```rust,no_run
//! use kit_negotiation::{Config, NegotiationConfig};
//!
//! Config::init(std::path::Path::new("."));
//!
//! let negotiation = Config::get::<NegotiationConfig>().unwrap();
//! println!("uploads go to {}", negotiation.upload_dir.display());
//! ```

pub mod env;
pub mod providers;
mod repository;

pub use env::{env, env_optional, load_dotenv, Environment};
pub use providers::{
    NegotiationConfig, NegotiationConfigBuilder, ServerConfig, ServerConfigBuilder,
    DEFAULT_HOST, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_FILE_SIZE, DEFAULT_PORT,
    DEFAULT_UPLOAD_PREFIX,
};

use std::any::Any;
use std::path::Path;

/// Facade over the typed config repository
pub struct Config;

impl Config {
    /// Load `.env` files from `project_root` and register the default configs
    ///
    /// Call once at startup, before building the server. Returns the
    /// detected environment.
    pub fn init(project_root: &Path) -> Environment {
        let env = load_dotenv(project_root);

        repository::register(env.clone());
        repository::register(ServerConfig::from_env());
        repository::register(NegotiationConfig::from_env());

        tracing::debug!(environment = %env, "configuration loaded");
        env
    }

    /// Get a registered config struct by type
    pub fn get<T: Any + Send + Sync + Clone + 'static>() -> Option<T> {
        repository::get::<T>()
    }

    /// Register a config struct, replacing any earlier value of the same type
    ///
    /// ```rust
    /// use kit_negotiation::Config;
    ///
    /// #[derive(Clone)]
    /// struct StorageConfig {
    ///     root: String,
    /// }
    ///
    /// Config::register(StorageConfig { root: "storage".into() });
    /// assert!(Config::has::<StorageConfig>());
    /// ```
    pub fn register<T: Any + Send + Sync + 'static>(config: T) {
        repository::register(config);
    }

    pub fn has<T: Any + 'static>() -> bool {
        repository::has::<T>()
    }

    /// The environment detected by [`Config::init`], or from `APP_ENV`
    pub fn environment() -> Environment {
        Self::get::<Environment>().unwrap_or_else(Environment::detect)
    }

    pub fn is_production() -> bool {
        Self::environment().is_production()
    }
}
