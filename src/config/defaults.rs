// src/config/defaults.rs
use crate::config::app::{CleanerConfig, LogConfig};

pub const DEFAULT_LOG_TARGET: &str = "stderr";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETENTION_DAYS: u32 = 10;

pub fn default_log_target() -> String {
    DEFAULT_LOG_TARGET.into()
}

pub fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.into()
}

pub fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

pub fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

pub fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            target: default_log_target(),
            level: default_log_level(),
        }
    }
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}
