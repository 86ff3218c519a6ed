//! Environment configuration.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

/// Top-level configuration for the memory engine, loaded from the process
/// environment with graceful defaults so a dev instance starts with nothing
/// set.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,

    pub bind_addr: IpAddr,

    /// Directory holding the sqlite database file.
    pub storage_path: PathBuf,

    /// Base URL of the embedding provider's HTTP API.
    pub embedding_endpoint: String,

    /// Bearer token sent to the embedding provider, if required.
    pub embedding_api_key: Option<String>,

    /// Expected embedding vector width (D). Every stored/returned vector
    /// must match this exactly.
    pub embedding_dim: usize,

    /// Capacity of the in-process hot tiers (vector index + result cache),
    /// measured in entries.
    pub hot_cache_capacity: u64,

    /// Token-bucket capacity for outbound embedding calls, per second.
    pub embedding_rate_per_sec: u32,

    /// Fraction of the rate-limit bucket reserved for interactive search
    /// embeds so bulk ingestion cannot starve them.
    pub embedding_reserved_fraction: f64,

    /// Optional OpenAI-compatible endpoint used for topic-label
    /// summarization. When unset, labels are keyword-derived only.
    pub llm_endpoint: Option<String>,
}

pub const DEFAULT_EMBEDDING_ENDPOINT: &str = "http://localhost:11434/v1/embeddings";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            storage_path: PathBuf::from("./.data"),
            embedding_endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            embedding_api_key: None,
            embedding_dim: crate::constants::DEFAULT_EMBEDDING_DIM,
            hot_cache_capacity: 10_000,
            embedding_rate_per_sec: 50,
            embedding_reserved_fraction: 0.2,
            llm_endpoint: None,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "MEMORIA_PORT";
    const ENV_BIND_ADDR: &'static str = "MEMORIA_BIND_ADDR";
    const ENV_STORAGE_PATH: &'static str = "MEMORIA_STORAGE_PATH";
    const ENV_EMBEDDING_ENDPOINT: &'static str = "MEMORIA_EMBEDDING_ENDPOINT";
    const ENV_EMBEDDING_API_KEY: &'static str = "MEMORIA_EMBEDDING_API_KEY";
    const ENV_EMBEDDING_DIM: &'static str = "MEMORIA_EMBEDDING_DIM";
    const ENV_HOT_CACHE_CAPACITY: &'static str = "MEMORIA_HOT_CACHE_CAPACITY";
    const ENV_EMBEDDING_RATE_PER_SEC: &'static str = "MEMORIA_EMBEDDING_RATE_PER_SEC";
    const ENV_EMBEDDING_RESERVED_FRACTION: &'static str = "MEMORIA_EMBEDDING_RESERVED_FRACTION";
    const ENV_LLM_ENDPOINT: &'static str = "MEMORIA_LLM_ENDPOINT";

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let storage_path = Self::parse_path_from_env(Self::ENV_STORAGE_PATH, defaults.storage_path);
        let embedding_endpoint =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_ENDPOINT, defaults.embedding_endpoint);
        let embedding_api_key = Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_API_KEY);
        let embedding_dim = Self::parse_dim_from_env(defaults.embedding_dim)?;
        let hot_cache_capacity =
            Self::parse_u64_from_env(Self::ENV_HOT_CACHE_CAPACITY, defaults.hot_cache_capacity);
        let embedding_rate_per_sec = Self::parse_u32_from_env(
            Self::ENV_EMBEDDING_RATE_PER_SEC,
            defaults.embedding_rate_per_sec,
        );
        let embedding_reserved_fraction = Self::parse_f64_from_env(
            Self::ENV_EMBEDDING_RESERVED_FRACTION,
            defaults.embedding_reserved_fraction,
        );
        let llm_endpoint = Self::parse_optional_string_from_env(Self::ENV_LLM_ENDPOINT);

        Ok(Self {
            port,
            bind_addr,
            storage_path,
            embedding_endpoint,
            embedding_api_key,
            embedding_dim,
            hot_cache_capacity,
            embedding_rate_per_sec,
            embedding_reserved_fraction,
            llm_endpoint,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.exists() && !self.storage_path.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.storage_path.clone(),
            });
        }

        if self.embedding_dim == 0 {
            return Err(ConfigError::InvalidDimension {
                value: self.embedding_dim.to_string(),
            });
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Path to the sqlite database file inside `storage_path`.
    pub fn database_path(&self) -> PathBuf {
        self.storage_path.join("memoria.sqlite3")
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_dim_from_env(default: usize) -> Result<usize, ConfigError> {
        match env::var(Self::ENV_EMBEDDING_DIM) {
            Ok(value) => value
                .parse::<usize>()
                .ok()
                .filter(|d| *d > 0)
                .ok_or(ConfigError::InvalidDimension { value }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_u32_from_env(var_name: &str, default: u32) -> u32 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_f64_from_env(var_name: &str, default: f64) -> f64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}
