// src/error.rs
//! Public error type for the entire crate
//!
//! Anything returned as `Err` is fatal to the current run. Per-record
//! failures, drift and the time budget are not errors; they end up in the
//! `RunReport` instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RekeyError>;

#[derive(Error, Debug)]
pub enum RekeyError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("KeyAPI transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("KeyAPI returned malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("KeyAPI protocol error: {0}")]
    Protocol(String),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RekeyError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        RekeyError::Config(msg.into())
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        RekeyError::Protocol(msg.into())
    }
}
