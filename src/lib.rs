// src/lib.rs
//! vault-rekey: online re-keying batch jobs for a card-tokenization vault
//!
//! Features:
//! - KEK re-encryption of DEKs and HMAC rehashing of tokens, one coordinator
//! - Fixed-size, optionally shuffled batches sent to the vault's KeyAPI
//! - Drift detection and time-boxed, cooperative cancellation
//! - Expired token cleanup

pub mod authority;
pub mod clock;
pub mod config;
pub mod consts;
pub mod enums;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod partition;
pub mod report;
pub mod store;

pub mod error;

// Re-export everything users need at the crate root
pub use authority::{KeyApiClient, KeyAuthority};
pub use clock::{Clock, SystemClock};
pub use config::load as load_config;
pub use enums::{KeyKind, TerminationReason};
pub use error::{RekeyError, Result};
pub use migrate::{MigrationSettings, Migrator, Resolution};
pub use model::{Batch, BatchOutcome, IdRange, KeyStatus, KeyStatusSet, MigrationTask};
pub use report::RunReport;
pub use store::{RecordStore, SqlRecordStore};
