// src/config/app.rs
use super::defaults::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::consts::{CONFIG_ENV, DB_PATH_ENV, DEFAULT_CONFIG_PATH, KEY_API_URL_ENV};
use crate::enums::KeyKind;
use crate::error::{RekeyError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    pub key_api: KeyApiConfig,
    pub db: DbConfig,
    /// KEK re-encryption job
    pub reencrypt: Option<MigrationConfig>,
    /// HMAC rehashing job
    pub rehash: Option<MigrationConfig>,
    #[serde(default)]
    pub cleaner: CleanerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `stderr`, or a file path to append to
    #[serde(default = "default_log_target")]
    pub target: String,
    /// Fallback filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyApiConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Required; kept optional here so the error names the missing key
    pub batch_size: Option<u64>,
    /// Absent means the run is not time-boxed
    pub time_limit_secs: Option<u64>,
    /// Random batch order. Holds the whole plan in memory, about
    /// `16 * id_count / batch_size` bytes; ascending order is streamed.
    #[serde(default)]
    pub shuffle_batches: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanerConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Job section for `kind`
    pub fn migration(&self, kind: KeyKind) -> Result<&MigrationConfig> {
        let (section, job) = match kind {
            KeyKind::Kek => ("reencrypt", &self.reencrypt),
            KeyKind::Hmac => ("rehash", &self.rehash),
        };
        job.as_ref()
            .ok_or_else(|| RekeyError::config(format!("missing [{section}] section")))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var(DB_PATH_ENV) {
            self.db.path = PathBuf::from(path);
        }
        if let Ok(url) = env::var(KEY_API_URL_ENV) {
            self.key_api.url = url;
        }
    }
}

/// `explicit`, else `$VAULT_REKEY_CONFIG`, else `vault-rekey.toml`
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
    }
}

/// Load config from disk. There is no built-in fallback: running a job
/// without its settings must fail loudly, never degrade to a no-op.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let config_path = resolve_path(explicit);
    let content = fs::read_to_string(&config_path).map_err(|err| {
        RekeyError::config(format!("cannot read {}: {err}", config_path.display()))
    })?;

    let mut conf = Config::from_toml_str(&content)?;
    conf.apply_env_overrides();
    Ok(conf)
}
