use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::store::{DEFAULT_SLOT_KEY, FileSlot, LocalStore, RemoteStore, StoreMode};

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_key() -> String {
    DEFAULT_SLOT_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            key: default_key(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl RemoteConfig {
    /// The configured base URL, ignoring blank values.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.filter(|s| *s > 0).map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_hostname() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_min_level")]
    pub min_level: String,
}

fn default_min_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            min_level: default_min_level(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: StoreMode,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_bytes(bytes: &[u8]) -> Result<Self> {
        let config: Config = serde_yaml::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let key = self.storage.key.trim();
        if key.is_empty() || key.contains(['/', '\\']) {
            anyhow::bail!("storage.key must be a plain, non-empty name");
        }

        if let Some(url) = self.remote.base_url() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("remote.base_url must be an http(s) URL: {}", url);
            }
        }

        if self.mode == StoreMode::Remote && self.remote.base_url().is_none() {
            anyhow::bail!("mode is remote but remote.base_url is not configured");
        }

        match self.logging.min_level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!("unknown logging.min_level: {}", other),
        }

        Ok(())
    }

    pub fn local_store(&self) -> LocalStore {
        LocalStore::new(FileSlot::new(&self.storage.data_dir, self.storage.key.trim()))
    }

    pub fn remote_store(&self) -> Result<Option<RemoteStore>> {
        match self.remote.base_url() {
            Some(url) => Ok(Some(RemoteStore::with_timeout(url, self.remote.timeout())?)),
            None => Ok(None),
        }
    }
}
