// src/model.rs
//! Plain data shared between the coordinator and its collaborators

use std::collections::BTreeMap;

use serde::Serialize;

use crate::enums::KeyKind;

/// Record id as stored in `t_dek` / `t_data_token`
pub type RecordId = i64;

/// Key version number as published by the KeyAPI
pub type KeyVersion = i64;

/// Inclusive, non-empty id range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdRange {
    min_id: RecordId,
    max_id: RecordId,
}

impl IdRange {
    /// `None` when `max_id < min_id`; an empty range has nothing to migrate.
    pub fn new(min_id: RecordId, max_id: RecordId) -> Option<Self> {
        (min_id <= max_id).then_some(Self { min_id, max_id })
    }

    pub fn min_id(&self) -> RecordId {
        self.min_id
    }

    pub fn max_id(&self) -> RecordId {
        self.max_id
    }

    /// Number of ids covered, saturating at `u64::MAX`
    pub fn id_count(&self) -> u64 {
        self.max_id.abs_diff(self.min_id).saturating_add(1)
    }
}

/// One unit of work sent to the KeyAPI in a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Batch {
    pub min_id: RecordId,
    pub max_id: RecordId,
}

impl Batch {
    pub fn id_count(&self) -> u64 {
        self.max_id.abs_diff(self.min_id).saturating_add(1)
    }
}

/// Per-batch result reported by the KeyAPI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub converted: u64,
    pub failed: u64,
}

/// State of one key version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyStatus {
    pub valid: bool,
    /// All key components confirmed; only meaningful for KEK
    pub checked: bool,
    /// Records currently on this version, when the KeyAPI reports it
    pub count: Option<u64>,
}

impl KeyStatus {
    /// Whether records may be migrated to this version
    pub fn is_ready(&self, kind: KeyKind) -> bool {
        self.valid && (!kind.requires_checked() || self.checked)
    }
}

/// Snapshot of the KeyAPI `status` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyStatusSet {
    keys: BTreeMap<(KeyKind, KeyVersion), KeyStatus>,
    pub keyapi_state: Option<String>,
    pub active_kek_version: Option<KeyVersion>,
    pub active_hmac_version: Option<KeyVersion>,
    pub target_kek_version: Option<KeyVersion>,
}

impl KeyStatusSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: KeyKind, version: KeyVersion, status: KeyStatus) {
        self.keys.insert((kind, version), status);
    }

    pub fn with(mut self, kind: KeyKind, version: KeyVersion, status: KeyStatus) -> Self {
        self.insert(kind, version, status);
        self
    }

    pub fn get(&self, kind: KeyKind, version: KeyVersion) -> Option<&KeyStatus> {
        self.keys.get(&(kind, version))
    }

    /// A version the KeyAPI does not list is never ready
    pub fn is_ready(&self, kind: KeyKind, version: KeyVersion) -> bool {
        self.get(kind, version)
            .is_some_and(|status| status.is_ready(kind))
    }

    /// Versions of `kind` in ascending order
    pub fn versions(&self, kind: KeyKind) -> impl Iterator<Item = (KeyVersion, &KeyStatus)> {
        self.keys
            .iter()
            .filter(move |((k, _), _)| *k == kind)
            .map(|((_, version), status)| (*version, status))
    }
}

/// What needs to move, and to which version. Built once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationTask {
    pub kind: KeyKind,
    /// Pinned for the whole run; later changes are detected as drift
    pub target_version: KeyVersion,
    pub range: IdRange,
}
