use crate::config::env::{env, env_optional};
use crate::negotiation::SniffFallback;
use std::path::PathBuf;

/// Default maximum size of a single uploaded file (10MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default filename prefix for multipart temp files
pub const DEFAULT_UPLOAD_PREFIX: &str = "kit_upload_";

/// Body negotiation and upload configuration
#[derive(Debug, Clone)]
pub struct NegotiationConfig {
    /// Directory multipart uploads are written to
    pub upload_dir: PathBuf,
    /// Filename prefix of multipart temp files
    pub upload_prefix: String,
    /// Maximum size of one uploaded file in bytes
    pub max_file_size: usize,
    /// What to do when a sniffed JSON body fails to decode
    pub sniff_fallback: SniffFallback,
}

impl NegotiationConfig {
    /// Build config from environment variables
    ///
    /// - `UPLOAD_TMP_DIR` (default: the OS temp directory)
    /// - `UPLOAD_PREFIX` (default: `kit_upload_`)
    /// - `UPLOAD_MAX_FILE_SIZE` (default: 10MB)
    /// - `JSON_SNIFF_FALLBACK`: `form` or `error` (default: `form`)
    pub fn from_env() -> Self {
        Self {
            upload_dir: env_optional("UPLOAD_TMP_DIR").unwrap_or_else(std::env::temp_dir),
            upload_prefix: env("UPLOAD_PREFIX", DEFAULT_UPLOAD_PREFIX.to_string()),
            max_file_size: env("UPLOAD_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
            sniff_fallback: env("JSON_SNIFF_FALLBACK", SniffFallback::default()),
        }
    }

    /// Create a builder for customizing config
    pub fn builder() -> NegotiationConfigBuilder {
        NegotiationConfigBuilder::default()
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Builder for NegotiationConfig
#[derive(Default)]
pub struct NegotiationConfigBuilder {
    upload_dir: Option<PathBuf>,
    upload_prefix: Option<String>,
    max_file_size: Option<usize>,
    sniff_fallback: Option<SniffFallback>,
}

impl NegotiationConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    pub fn upload_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.upload_prefix = Some(prefix.into());
        self
    }

    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = Some(size);
        self
    }

    pub fn sniff_fallback(mut self, policy: SniffFallback) -> Self {
        self.sniff_fallback = Some(policy);
        self
    }

    /// Build the NegotiationConfig, filling unset values from the environment
    pub fn build(self) -> NegotiationConfig {
        let default = NegotiationConfig::from_env();
        NegotiationConfig {
            upload_dir: self.upload_dir.unwrap_or(default.upload_dir),
            upload_prefix: self.upload_prefix.unwrap_or(default.upload_prefix),
            max_file_size: self.max_file_size.unwrap_or(default.max_file_size),
            sniff_fallback: self.sniff_fallback.unwrap_or(default.sniff_fallback),
        }
    }
}
