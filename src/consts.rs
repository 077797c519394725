// src/consts.rs
//! Shared constants: config keys, table names, KeyAPI methods

/// `t_config` key holding the KEK version DEKs should be re-encrypted to
pub const KEK_TARGET_CONFIG_KEY: &str = "KEK_TARGET_VERSION";

/// `t_config` key holding the active HMAC version tokens should be rehashed to
pub const HMAC_TARGET_CONFIG_KEY: &str = "HMAC_VERSION";

/// KeyAPI method names (appended to the configured base URL)
pub const KEYAPI_STATUS: &str = "status";
pub const KEYAPI_REENCRYPT_DEKS: &str = "reencrypt_deks";
pub const KEYAPI_REHASH_TOKENS: &str = "rehash_tokens";

/// `<status>` value of every successful KeyAPI response
pub const KEYAPI_SUCCESS: &str = "success";

/// Upper bound for the wrapper's `--random-delay` start-up jitter
pub const RANDOM_DELAY_MAX_SECS: f64 = 30.0;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "VAULT_REKEY_CONFIG";

/// Config file used when neither `--config` nor `VAULT_REKEY_CONFIG` is given
pub const DEFAULT_CONFIG_PATH: &str = "vault-rekey.toml";

/// Test isolation overrides
pub const DB_PATH_ENV: &str = "VAULT_REKEY_DB";
pub const KEY_API_URL_ENV: &str = "VAULT_REKEY_KEY_API_URL";
