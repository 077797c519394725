// src/enums.rs
//! Public enum types used throughout the crate
//!
//! The key kind a job operates on and the reason a run ended.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{
    HMAC_TARGET_CONFIG_KEY, KEK_TARGET_CONFIG_KEY, KEYAPI_REENCRYPT_DEKS, KEYAPI_REHASH_TOKENS,
};

/// Which family of keys a migration moves records between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Key-encryption keys; records are DEKs in `t_dek`
    Kek,
    /// HMAC keys; records are tokens in `t_data_token`
    Hmac,
}

impl KeyKind {
    /// `t_config` key the target version is published under
    pub fn target_config_key(self) -> &'static str {
        match self {
            KeyKind::Kek => KEK_TARGET_CONFIG_KEY,
            KeyKind::Hmac => HMAC_TARGET_CONFIG_KEY,
        }
    }

    /// Table and version column holding the records of this kind
    pub fn record_table(self) -> (&'static str, &'static str) {
        match self {
            KeyKind::Kek => ("t_dek", "kek_version"),
            KeyKind::Hmac => ("t_data_token", "hmac_version"),
        }
    }

    /// KeyAPI method migrating one id range to the current target
    pub fn migrate_method(self) -> &'static str {
        match self {
            KeyKind::Kek => KEYAPI_REENCRYPT_DEKS,
            KeyKind::Hmac => KEYAPI_REHASH_TOKENS,
        }
    }

    /// Only KEK versions go through the component confirmation ("checked") step
    pub fn requires_checked(self) -> bool {
        matches!(self, KeyKind::Kek)
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Kek => f.write_str("KEK"),
            KeyKind::Hmac => f.write_str("HMAC"),
        }
    }
}

/// Why a run stopped. Every variant is a normal outcome (exit status 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Every planned batch was executed
    Completed,
    /// No target configured, or no record is off the target version
    NothingToDo,
    /// Target version is not valid (or, for KEK, not checked) yet
    TargetNotReady,
    /// Target version changed while the run was in progress
    VersionDrifted,
    /// Time budget used up; remaining batches are left for the next run
    TimeLimitReached,
}

impl TerminationReason {
    /// True when the run stopped before executing every planned batch
    pub fn is_abort(self) -> bool {
        matches!(
            self,
            TerminationReason::VersionDrifted | TerminationReason::TimeLimitReached
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            TerminationReason::Completed => "Migration done",
            TerminationReason::NothingToDo => "Nothing to do",
            TerminationReason::TargetNotReady => "Target not ready",
            TerminationReason::VersionDrifted => "Target changed",
            TerminationReason::TimeLimitReached => "Time limit reached",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
