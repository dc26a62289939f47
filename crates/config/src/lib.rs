//! Layered configuration for hepc.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults,
//! 2. an optional configuration file (YAML, TOML or JSON, by extension),
//! 3. `HEPC_`-prefixed environment variables, nested with `__`
//!    (`HEPC_STORAGE__ROOT=/srv/dbs`),
//! 4. explicit [`Overrides`] (command-line flags).

pub mod error;
mod models;

pub use crate::models::*;
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "HEPC_";
const CONFIG_FILE_STEM: &str = "config";
const CONFIG_EXTENSIONS: [&str; 4] = ["yaml", "yml", "toml", "json"];

/// Values that take precedence over every other source. `None` leaves the
/// underlying value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub endpoint_url: Option<String>,
    /// `local` or `s3`.
    pub storage_kind: Option<String>,
    pub db_dir: Option<PathBuf>,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub cache_ttl_seconds: Option<u64>,
}

impl Overrides {
    fn merge_into(&self, figment: Figment) -> Figment {
        fn set<T: Serialize>(figment: Figment, key: &str, value: Option<&T>) -> Figment {
            match value {
                Some(value) => figment.merge(Serialized::default(key, value)),
                None => figment,
            }
        }
        let figment = set(figment, "server.host", self.host.as_ref());
        let figment = set(figment, "server.port", self.port.as_ref());
        let figment = set(figment, "server.endpoint_url", self.endpoint_url.as_ref());
        let figment = set(figment, "storage.kind", self.storage_kind.as_ref());
        let figment = set(figment, "storage.root", self.db_dir.as_ref());
        let figment = set(figment, "storage.bucket", self.s3_bucket.as_ref());
        let figment = set(figment, "storage.prefix", self.s3_prefix.as_ref());
        let figment = set(figment, "storage.region", self.s3_region.as_ref());
        let figment = set(figment, "storage.endpoint", self.s3_endpoint.as_ref());
        set(figment, "cache.ttl_seconds", self.cache_ttl_seconds.as_ref())
    }
}

/// First `config.{yaml,yml,toml,json}` in the platform's configuration
/// directory for hepc, if any.
pub fn default_config_file() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "hepc")?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dirs.config_dir().join(format!("{CONFIG_FILE_STEM}.{ext}")))
        .find(|path| path.is_file())
}

/// Assemble every configuration source except the overrides.
///
/// # Errors
///
/// [`Invalid`](ErrorKind::Invalid) if `file` doesn't exist or has an
/// extension that isn't a supported format.
pub fn figment(file: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(file) = file {
        if !file.is_file() {
            exn::bail!(ErrorKind::Invalid(format!("config file {} does not exist", file.display())));
        }
        let extension = file.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        figment = match extension.as_deref() {
            Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
            Some("toml") => figment.merge(Toml::file(file)),
            Some("json") => figment.merge(Json::file(file)),
            _ => exn::bail!(ErrorKind::Invalid(format!(
                "unsupported config file format: {}",
                file.display()
            ))),
        };
        tracing::debug!(file = %file.display(), "Loading configuration file");
    }
    Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
}

impl Config {
    /// Load and validate configuration from every source.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let figment = overrides.merge_into(figment(file)?);
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }
}
