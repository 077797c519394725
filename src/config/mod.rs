// src/config/mod.rs
//! Configuration system for vault-rekey
//!
//! TOML file + env overrides, loaded once by the binary and handed to the
//! components that need it.

pub use app::{
    load, resolve_path, CleanerConfig, Config, DbConfig, KeyApiConfig, LogConfig,
    MigrationConfig,
};

mod app;
mod defaults;
