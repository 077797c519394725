// src/report.rs
//! Run report: what a migration run did and why it stopped

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::enums::{KeyKind, TerminationReason};
use crate::model::{BatchOutcome, KeyVersion};

/// Mutable accumulator owned by the coordinator while a run is in progress
#[derive(Debug)]
pub struct RunTally {
    kind: KeyKind,
    target_version: Option<KeyVersion>,
    converted: u64,
    failed: u64,
    batches_planned: usize,
    batches_done: usize,
}

impl RunTally {
    pub fn new(kind: KeyKind) -> Self {
        Self {
            kind,
            target_version: None,
            converted: 0,
            failed: 0,
            batches_planned: 0,
            batches_done: 0,
        }
    }

    pub fn set_target(&mut self, version: KeyVersion) {
        self.target_version = Some(version);
    }

    pub fn set_planned(&mut self, batches: usize) {
        self.batches_planned = batches;
    }

    /// Count one executed batch
    pub fn record(&mut self, outcome: BatchOutcome) {
        self.converted = self.converted.saturating_add(outcome.converted);
        self.failed = self.failed.saturating_add(outcome.failed);
        self.batches_done += 1;
    }

    /// Freeze into the report handed to the caller
    pub fn finish(self, reason: TerminationReason, elapsed: Duration) -> RunReport {
        RunReport {
            kind: self.kind,
            target_version: self.target_version,
            converted_total: self.converted,
            failed_total: self.failed,
            batches_planned: self.batches_planned,
            batches_done: self.batches_done,
            reason,
            elapsed,
        }
    }
}

/// Final, immutable outcome of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    kind: KeyKind,
    target_version: Option<KeyVersion>,
    converted_total: u64,
    failed_total: u64,
    batches_planned: usize,
    batches_done: usize,
    reason: TerminationReason,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    elapsed: Duration,
}

impl RunReport {
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Pinned target version; `None` when the run ended before one was resolved
    pub fn target_version(&self) -> Option<KeyVersion> {
        self.target_version
    }

    pub fn converted_total(&self) -> u64 {
        self.converted_total
    }

    pub fn failed_total(&self) -> u64 {
        self.failed_total
    }

    pub fn batches_planned(&self) -> usize {
        self.batches_planned
    }

    pub fn batches_done(&self) -> usize {
        self.batches_done
    }

    pub fn reason(&self) -> TerminationReason {
        self.reason
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// One-line human readable summary for the log
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}! Converted: {}, failed: {}, {:.3} sec elapsed",
            self.kind,
            self.reason,
            self.converted_total,
            self.failed_total,
            self.elapsed.as_secs_f64()
        )
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
