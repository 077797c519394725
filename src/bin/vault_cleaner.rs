// src/bin/vault_cleaner.rs
//! Cleanup cron: deletes tokens that expired within the retention window

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::info;
use vault_rekey::{config, logging, SqlRecordStore};

/// Delete expired tokens from the vault database
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: $VAULT_REKEY_CONFIG or ./vault-rekey.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `[cleaner] retention_days`
    #[arg(long)]
    retention_days: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = config::resolve_path(cli.config.as_deref());
    let cfg = config::load(Some(config_path.as_path()))
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    logging::init(&cfg.log).context("Failed to initialise logging")?;
    info!("Application started");

    let retention_days = cli.retention_days.unwrap_or(cfg.cleaner.retention_days);
    let mut store = SqlRecordStore::open(&cfg.db.path)
        .with_context(|| format!("Failed to open record store {}", cfg.db.path.display()))?;

    let deleted = store
        .purge_expired_tokens(Local::now().naive_local(), retention_days)
        .context("Cleanup failed, rolled back")?;

    println!("Deleted {deleted} expired token(s)");
    Ok(())
}
