// src/bin/vault_rekey.rs
//! Re-keying cron job: KEK re-encryption / HMAC rehashing, plus key status

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::Rng;
use serde::Serialize;
use tracing::info;
use vault_rekey::consts::RANDOM_DELAY_MAX_SECS;
use vault_rekey::{
    config, logging, KeyApiClient, KeyAuthority, KeyKind, KeyStatusSet, MigrationSettings,
    Migrator, SqlRecordStore,
};

/// Migrate vault records to the current KEK / HMAC key version
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: $VAULT_REKEY_CONFIG or ./vault-rekey.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sleep a random 0-30 s before starting, to spread out cron starts
    #[arg(long)]
    random_delay: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-encrypt DEKs under the target KEK version
    Kek(RunArgs),
    /// Rehash tokens with the active HMAC version
    Hmac(RunArgs),
    /// Show the KeyAPI key status table
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Process batches in random order (overrides the config file)
    #[arg(long)]
    shuffle_batches: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = config::resolve_path(cli.config.as_deref());
    let cfg = config::load(Some(config_path.as_path()))
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    logging::init(&cfg.log).context("Failed to initialise logging")?;

    if cli.random_delay {
        let delay = rand::rng().random_range(0.0..RANDOM_DELAY_MAX_SECS);
        info!("Random delay: {delay:.3} sec");
        std::thread::sleep(Duration::from_secs_f64(delay));
    }

    let started = Instant::now();
    info!("Application started");

    let authority = KeyApiClient::new(&cfg.key_api).context("Failed to build KeyAPI client")?;

    let result = match cli.command {
        Command::Kek(args) => run_job(KeyKind::Kek, &args, &cfg, authority),
        Command::Hmac(args) => run_job(KeyKind::Hmac, &args, &cfg, authority),
        Command::Status { json } => show_status(&authority, json),
    };

    info!(
        "Application finished. {:.3} sec elapsed.",
        started.elapsed().as_secs_f64()
    );
    result
}

fn run_job(
    kind: KeyKind,
    args: &RunArgs,
    cfg: &config::Config,
    authority: KeyApiClient,
) -> Result<()> {
    let mut settings = MigrationSettings::from_config(kind, cfg)?;
    if args.shuffle_batches {
        settings = settings.with_shuffle(true);
    }

    let store = SqlRecordStore::open(&cfg.db.path)
        .with_context(|| format!("Failed to open record store {}", cfg.db.path.display()))?;

    let report = Migrator::new(authority, store)
        .run(kind, &settings)
        .with_context(|| format!("{kind} migration failed"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusRow {
    kind: KeyKind,
    version: i64,
    valid: bool,
    checked: Option<bool>,
    count: Option<u64>,
}

fn status_rows(status: &KeyStatusSet) -> Vec<StatusRow> {
    [KeyKind::Kek, KeyKind::Hmac]
        .into_iter()
        .flat_map(|kind| {
            status.versions(kind).map(move |(version, key)| StatusRow {
                kind,
                version,
                valid: key.valid,
                checked: kind.requires_checked().then_some(key.checked),
                count: key.count,
            })
        })
        .collect()
}

fn show_status(authority: &KeyApiClient, json: bool) -> Result<()> {
    let status = authority.status().context("KeyAPI status call failed")?;
    let rows = status_rows(&status);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let opt = |v: Option<i64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
    println!("KeyAPI state:       {}", status.keyapi_state.as_deref().unwrap_or("-"));
    println!("Active KEK version: {}", opt(status.active_kek_version));
    println!("Target KEK version: {}", opt(status.target_kek_version));
    println!("Active HMAC version: {}", opt(status.active_hmac_version));
    println!("{}", "=".repeat(48));
    println!("{:<6} {:>8} {:>6} {:>8} {:>12}", "KIND", "VERSION", "VALID", "CHECKED", "COUNT");
    for row in &rows {
        println!(
            "{:<6} {:>8} {:>6} {:>8} {:>12}",
            row.kind.to_string(),
            row.version,
            row.valid,
            row.checked.map_or("-".to_string(), |c| c.to_string()),
            row.count.map_or("-".to_string(), |c| c.to_string()),
        );
    }
    println!("{}", "=".repeat(48));
    Ok(())
}
