// Configuration module entry point
// Loads the host configuration from file and environment

mod types;

use std::net::SocketAddr;

pub use types::Config;

/// Default config file name (extension resolved by the `config` crate)
pub const DEFAULT_CONFIG: &str = "embedserve";

impl Config {
    /// Load configuration from `config_path` (file optional) and
    /// `EMBEDSERVE_*` environment variables, e.g. `EMBEDSERVE_SERVER__PORT`
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("EMBEDSERVE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("site.root", "public")?
            .set_default("site.url_prefix", "/")?
            .set_default("site.use_etag", true)?
            .set_default("site.strict", false)?
            .set_default("site.in_memory", true)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .build()?;

        settings.try_deserialize()
    }

    /// Load from the path given as first CLI argument, or the default
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
        Self::load_from(&path)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
