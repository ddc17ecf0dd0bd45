// Configuration types module

use embedserve::{BuildMode, ServeConfig};
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// What to serve and how
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Directory holding the files to serve
    pub root: String,
    /// Serve only this sub-directory of `root`
    #[serde(default)]
    pub sub_dir: Option<String>,
    pub url_prefix: String,
    pub use_etag: bool,
    /// Refuse to start when anything under `root` cannot be read
    pub strict: bool,
    /// Snapshot `root` into memory at startup instead of reading from disk
    pub in_memory: bool,
}

impl SiteConfig {
    pub fn build_mode(&self) -> BuildMode {
        if self.strict {
            BuildMode::Strict
        } else {
            BuildMode::Lenient
        }
    }

    pub fn serve_config(&self) -> ServeConfig {
        ServeConfig::new()
            .url_prefix(self.url_prefix.clone())
            .use_etag(self.use_etag)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Access log file path (stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
}
