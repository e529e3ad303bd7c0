//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Remote media storage configuration.
    pub storage: StorageConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Remote media storage (image CDN) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Whether the remote provider is configured and usable.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Provider cloud/tenant name (first path segment of delivery URLs).
    #[serde(default)]
    pub cloud_name: String,
    /// API key for the provider upload endpoint.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Unsigned upload preset, if the provider account uses one.
    #[serde(default)]
    pub upload_preset: Option<String>,
    /// Logical folder post images are filed under.
    #[serde(default = "default_upload_folder")]
    pub upload_folder: String,
    /// Canonical delivery host all image URLs should resolve to.
    #[serde(default = "default_cdn_host")]
    pub cdn_host: String,
    /// Upload API base URL.
    #[serde(default = "default_upload_api")]
    pub upload_api: String,
    /// Local directory historical media files were written to.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    /// Upload request timeout in seconds.
    #[serde(default = "default_upload_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_true() -> bool {
    true
}

fn default_upload_folder() -> String {
    "futo_media/posts".to_string()
}

fn default_cdn_host() -> String {
    "res.cloudinary.com".to_string()
}

fn default_upload_api() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

const fn default_upload_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `FUTO_ENV`)
    /// 3. Environment variables with `FUTO_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("FUTO_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FUTO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FUTO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
