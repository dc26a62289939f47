use crate::error::{ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8070;
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 5 * 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL used in result URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            endpoint_url: None,
        }
    }
}
impl ServerConfig {
    /// The configured endpoint, or `http://<host>:<port>`.
    pub fn effective_endpoint_url(&self) -> String {
        match self.endpoint_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("http://{}:{}", self.host, self.port),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }
}
impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Where databases are stored, tagged by `kind`.
///
/// ```yaml
/// storage:
///   kind: s3
///   bucket: codeql-databases
///   prefix: nightly/
///   region: us-west-004
///   endpoint: https://s3.us-west-004.backblazeb2.com
///   key_id: "..."
///   key_secret: "..."
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    Local {
        #[serde(default)]
        root: PathBuf,
    },
    S3 {
        #[serde(default)]
        bucket: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
        #[serde(default)]
        region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        #[serde(default)]
        key_id: String,
        #[serde(default)]
        key_secret: String,
    },
}
impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local { root: PathBuf::new() }
    }
}
impl StorageConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::S3 { .. } => "s3",
        }
    }
}

fn require(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        exn::bail!(ErrorKind::Invalid(format!("{name} is required")));
    }
    Ok(())
}

impl Config {
    /// Reject configurations that can't produce a working server.
    pub fn validate(&self) -> Result<()> {
        require(&self.server.host, "server.host")?;
        if self.cache.ttl_seconds == 0 {
            exn::bail!(ErrorKind::Invalid("cache.ttl_seconds must be greater than zero".to_string()));
        }
        match &self.storage {
            StorageConfig::Local { root } => {
                if root.as_os_str().is_empty() {
                    exn::bail!(ErrorKind::Invalid("storage.root is required for local storage".to_string()));
                }
            },
            StorageConfig::S3 { bucket, region, key_id, key_secret, .. } => {
                require(bucket, "storage.bucket")?;
                require(region, "storage.region")?;
                require(key_id, "storage.key_id")?;
                require(key_secret, "storage.key_secret")?;
            },
        }
        Ok(())
    }
}
