// src/logging.rs
//! tracing-subscriber setup for the binaries

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;
use crate::error::Result;

/// Install the global subscriber. `RUST_LOG` wins over `config.level`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.target.as_str() {
        "stderr" | "syslog" | "" => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .with(filter)
                .try_init()
                .ok();
        }
        path => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .with(filter)
                .try_init()
                .ok();
        }
    }
    Ok(())
}
