// src/authority/mod.rs
//! Key authority: the vault's KeyAPI, reached over XML-over-HTTP
//!
//! The coordinator only depends on [`KeyAuthority`]; [`KeyApiClient`] is the
//! production implementation.

pub mod xml;

use std::time::Duration;

use tracing::{debug, info};

use crate::config::KeyApiConfig;
use crate::consts::KEYAPI_STATUS;
use crate::enums::KeyKind;
use crate::error::{RekeyError, Result};
use crate::model::{Batch, BatchOutcome, KeyStatusSet};

/// Remote operations the migrator consumes
pub trait KeyAuthority {
    /// Current state of every KEK and HMAC version
    fn status(&self) -> Result<KeyStatusSet>;

    /// Move every record of `kind` with id in `batch` that is not on the
    /// authority's current target onto it
    fn migrate_batch(&self, kind: KeyKind, batch: Batch) -> Result<BatchOutcome>;
}

impl<T: KeyAuthority + ?Sized> KeyAuthority for &T {
    fn status(&self) -> Result<KeyStatusSet> {
        (**self).status()
    }

    fn migrate_batch(&self, kind: KeyKind, batch: Batch) -> Result<BatchOutcome> {
        (**self).migrate_batch(kind, batch)
    }
}

/// Blocking KeyAPI client
pub struct KeyApiClient {
    base_url: String,
    http_client: reqwest::blocking::Client,
}

impl KeyApiClient {
    pub fn new(config: &KeyApiConfig) -> Result<Self> {
        let url = config.url.trim();
        if url.is_empty() {
            return Err(RekeyError::config("key_api.url must not be empty"));
        }
        let mut base_url = url.to_owned();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let http_client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn call(&self, method: &str, params: &[(&str, String)]) -> Result<String> {
        let uri = format!("{}{}", self.base_url, method);
        info!("Calling KeyAPI: {uri}");
        debug!("params: {params:?}");

        let body = self
            .http_client
            .post(&uri)
            .form(params)
            .send()?
            .error_for_status()?
            .text()?;

        debug!("Response from KeyAPI: {body}");
        Ok(body)
    }
}

impl KeyAuthority for KeyApiClient {
    fn status(&self) -> Result<KeyStatusSet> {
        let body = self.call(KEYAPI_STATUS, &[])?;
        xml::parse_status(&body)
    }

    fn migrate_batch(&self, kind: KeyKind, batch: Batch) -> Result<BatchOutcome> {
        let params = [
            ("id_min", batch.min_id.to_string()),
            ("id_max", batch.max_id.to_string()),
        ];
        let body = self.call(kind.migrate_method(), &params)?;
        xml::parse_batch_outcome(&body)
    }
}
