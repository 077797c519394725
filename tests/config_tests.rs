//! tests/config_tests.rs: TOML config and job settings

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::tempdir;
use vault_rekey::config::{self, Config};
use vault_rekey::{KeyKind, MigrationSettings, RekeyError};

const FULL_CONFIG: &str = r#"
[log]
target = "/var/log/vault-rekey.log"
level = "debug"

[key_api]
url = "https://localhost:15119/keyapi/"
timeout_secs = 120

[db]
path = "/var/lib/vault/vault.db"

[reencrypt]
batch_size = 1000

[rehash]
batch_size = 500
time_limit_secs = 3300
shuffle_batches = true

[cleaner]
retention_days = 14
"#;

const MINIMAL_CONFIG: &str = r#"
[key_api]
url = "http://127.0.0.1:15119/keyapi"

[db]
path = "vault.db"
"#;

#[test]
fn full_config_parses() {
    let cfg = Config::from_toml_str(FULL_CONFIG).unwrap();

    assert_eq!(cfg.log.level, "debug");
    assert_eq!(cfg.key_api.timeout_secs, 120);
    assert_eq!(cfg.key_api.connect_timeout_secs, 10);
    assert_eq!(cfg.db.path, Path::new("/var/lib/vault/vault.db"));
    assert_eq!(cfg.cleaner.retention_days, 14);

    let kek = MigrationSettings::from_config(KeyKind::Kek, &cfg).unwrap();
    assert_eq!(kek.batch_size(), 1000);
    assert_eq!(kek.time_limit(), None);
    assert!(!kek.shuffle());

    let hmac = MigrationSettings::from_config(KeyKind::Hmac, &cfg).unwrap();
    assert_eq!(hmac.batch_size(), 500);
    assert_eq!(hmac.time_limit(), Some(Duration::from_secs(3300)));
    assert!(hmac.shuffle());
}

#[test]
fn minimal_config_uses_defaults() {
    let cfg = Config::from_toml_str(MINIMAL_CONFIG).unwrap();

    assert_eq!(cfg.log.target, "stderr");
    assert_eq!(cfg.log.level, "info");
    assert_eq!(cfg.key_api.timeout_secs, 30);
    assert_eq!(cfg.cleaner.retention_days, 10);
}

#[test]
fn missing_job_section_is_a_configuration_error() {
    let cfg = Config::from_toml_str(MINIMAL_CONFIG).unwrap();
    let err = MigrationSettings::from_config(KeyKind::Kek, &cfg).unwrap_err();
    assert!(matches!(err, RekeyError::Config(ref msg) if msg.contains("[reencrypt]")));
}

#[test]
fn missing_batch_size_is_a_configuration_error() {
    let toml = format!("{MINIMAL_CONFIG}\n[rehash]\ntime_limit_secs = 60\n");
    let cfg = Config::from_toml_str(&toml).unwrap();

    let err = MigrationSettings::from_config(KeyKind::Hmac, &cfg).unwrap_err();
    assert!(matches!(err, RekeyError::Config(ref msg) if msg.contains("batch_size")));
}

#[test]
fn zero_batch_size_is_rejected() {
    let toml = format!("{MINIMAL_CONFIG}\n[reencrypt]\nbatch_size = 0\n");
    let cfg = Config::from_toml_str(&toml).unwrap();
    assert!(matches!(
        MigrationSettings::from_config(KeyKind::Kek, &cfg),
        Err(RekeyError::Config(_))
    ));
}

#[test]
fn missing_key_api_url_is_invalid_toml() {
    let err = Config::from_toml_str("[key_api]\n[db]\npath = \"x.db\"\n").unwrap_err();
    assert!(matches!(err, RekeyError::Toml(_)));
}

#[test]
fn unknown_section_is_rejected() {
    let toml = format!("{MINIMAL_CONFIG}\n[reencrypt_typo]\nbatch_size = 10\n");
    assert!(matches!(
        Config::from_toml_str(&toml),
        Err(RekeyError::Toml(_))
    ));
}

#[test]
fn load_reads_explicit_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vault-rekey.toml");
    fs::write(&path, FULL_CONFIG).unwrap();

    let cfg = config::load(Some(path.as_path())).unwrap();
    assert_eq!(cfg.key_api.url, "https://localhost:15119/keyapi/");
}

#[test]
fn load_without_file_fails_loudly() {
    let dir = tempdir().unwrap();
    let err = config::load(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
    assert!(matches!(err, RekeyError::Config(_)));
}

#[test]
fn misspelled_time_limit_in_job_section_is_rejected() {
    let toml = format!("{MINIMAL_CONFIG}\n[rehash]\nbatch_size = 100\ntime_limit = 3300\n");
    assert!(matches!(
        Config::from_toml_str(&toml),
        Err(RekeyError::Toml(_))
    ));
}

#[test]
fn unknown_key_in_key_api_section_is_rejected() {
    let toml = "[key_api]\nurl = \"http://127.0.0.1/\"\ntimeout = 5\n[db]\npath = \"vault.db\"\n";
    assert!(matches!(
        Config::from_toml_str(toml),
        Err(RekeyError::Toml(_))
    ));
}
