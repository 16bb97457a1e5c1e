use crate::config::env::env;

/// Default address the server binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port the server listens on
pub const DEFAULT_PORT: u16 = 8080;

/// Default maximum request body size (10MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Maximum request body size in bytes; larger bodies get a 413
    pub max_body_size: usize,
}

impl ServerConfig {
    /// Build config from `SERVER_HOST`, `SERVER_PORT` and `SERVER_MAX_BODY_SIZE`
    pub fn from_env() -> Self {
        Self {
            host: env("SERVER_HOST", DEFAULT_HOST.to_string()),
            port: env("SERVER_PORT", DEFAULT_PORT),
            max_body_size: env("SERVER_MAX_BODY_SIZE", DEFAULT_MAX_BODY_SIZE),
        }
    }

    /// Create a builder for customizing config
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    max_body_size: Option<usize>,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the maximum request body size in bytes
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = Some(size);
        self
    }

    /// Build the ServerConfig, filling unset values from the environment
    pub fn build(self) -> ServerConfig {
        let default = ServerConfig::from_env();
        ServerConfig {
            host: self.host.unwrap_or(default.host),
            port: self.port.unwrap_or(default.port),
            max_body_size: self.max_body_size.unwrap_or(default.max_body_size),
        }
    }
}
