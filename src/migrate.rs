// src/migrate.rs
//! Online re-keying batch migrator
//!
//! One generic coordinator serves both jobs: KEK re-encryption of DEKs and
//! HMAC rehashing of tokens. A run resolves a [`MigrationTask`] (target
//! version pinned once), splits the pending id range into batches and sends
//! them to the KeyAPI strictly one at a time. Between batches it re-reads
//! the target version and the clock:
//!
//! - target changed → stop with [`TerminationReason::VersionDrifted`]
//! - time budget used up → stop with [`TerminationReason::TimeLimitReached`]
//!
//! Drift is checked first. Neither check can interrupt a batch in flight, so
//! the batch size bounds both cancellation latency and time-limit overshoot.
//!
//! Remote and database errors abort the run without a report; per-record
//! failures are only counted.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::authority::KeyAuthority;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::enums::{KeyKind, TerminationReason};
use crate::error::{RekeyError, Result};
use crate::model::{KeyVersion, MigrationTask};
use crate::partition;
use crate::report::{RunReport, RunTally};
use crate::store::RecordStore;

/// Per-run knobs: batch size, time budget, batch order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSettings {
    batch_size: u64,
    time_limit: Option<Duration>,
    shuffle: bool,
}

impl MigrationSettings {
    /// `batch_size` must be at least 1
    pub fn new(batch_size: u64) -> Result<Self> {
        if batch_size == 0 {
            return Err(RekeyError::config("batch_size must be at least 1"));
        }
        Ok(Self {
            batch_size,
            time_limit: None,
            shuffle: false,
        })
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Settings of the `[reencrypt]` (KEK) or `[rehash]` (HMAC) section
    pub fn from_config(kind: KeyKind, config: &Config) -> Result<Self> {
        let job = config.migration(kind)?;
        let batch_size = job
            .batch_size
            .ok_or_else(|| RekeyError::config(format!("{kind} job: batch_size is required")))?;

        let mut settings = Self::new(batch_size)?.with_shuffle(job.shuffle_batches);
        if let Some(secs) = job.time_limit_secs {
            settings = settings.with_time_limit(Duration::from_secs(secs));
        }
        Ok(settings)
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }
}

/// Result of the resolving phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Records are pending and the target is ready
    Ready(MigrationTask),
    /// Nothing will be migrated in this run
    Skip {
        target_version: Option<KeyVersion>,
        reason: TerminationReason,
    },
}

/// Migration coordinator, generic over its collaborators
pub struct Migrator<A, S, C = SystemClock> {
    authority: A,
    store: S,
    clock: C,
    rng: StdRng,
}

impl<A: KeyAuthority, S: RecordStore> Migrator<A, S, SystemClock> {
    pub fn new(authority: A, store: S) -> Self {
        Self {
            authority,
            store,
            clock: SystemClock,
            rng: StdRng::from_os_rng(),
        }
    }
}

impl<A: KeyAuthority, S: RecordStore, C: Clock> Migrator<A, S, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Migrator<A, S, C2> {
        Migrator {
            authority: self.authority,
            store: self.store,
            clock,
            rng: self.rng,
        }
    }

    /// Fix the shuffle order, e.g. to reproduce a run
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Work out what this run has to do, without touching any record
    pub fn resolve_task(&self, kind: KeyKind) -> Result<Resolution> {
        let Some(target_version) = self.store.current_target_version(kind)? else {
            info!("No target {kind} version configured");
            return Ok(Resolution::Skip {
                target_version: None,
                reason: TerminationReason::NothingToDo,
            });
        };
        info!("Target {kind}: {target_version}");

        let status = self.authority.status()?;
        match status.get(kind, target_version) {
            Some(key) if key.is_ready(kind) => {}
            Some(key) => {
                if !key.valid {
                    warn!("Target {kind} is not valid");
                } else {
                    warn!("Target {kind} is not checked");
                }
                return Ok(Resolution::Skip {
                    target_version: Some(target_version),
                    reason: TerminationReason::TargetNotReady,
                });
            }
            None => {
                warn!("Target {kind} {target_version} is unknown to the KeyAPI");
                return Ok(Resolution::Skip {
                    target_version: Some(target_version),
                    reason: TerminationReason::TargetNotReady,
                });
            }
        }

        match self.store.id_range_not_on_version(kind, target_version)? {
            Some(range) => Ok(Resolution::Ready(MigrationTask {
                kind,
                target_version,
                range,
            })),
            None => Ok(Resolution::Skip {
                target_version: Some(target_version),
                reason: TerminationReason::NothingToDo,
            }),
        }
    }

    /// Run one migration of `kind` to its current target version
    pub fn run(&mut self, kind: KeyKind, settings: &MigrationSettings) -> Result<RunReport> {
        let started = self.clock.now();
        let mut tally = RunTally::new(kind);

        let task = match self.resolve_task(kind)? {
            Resolution::Ready(task) => task,
            Resolution::Skip {
                target_version,
                reason,
            } => {
                if let Some(version) = target_version {
                    tally.set_target(version);
                }
                return Ok(self.finish(tally, reason, started));
            }
        };
        tally.set_target(task.target_version);

        let batches = partition::plan(
            task.range,
            settings.batch_size,
            settings.shuffle,
            &mut self.rng,
        );
        tally.set_planned(batches.len());
        info!(
            "{kind} task: version {} ids [{} .. {}], {} batch(es) of {}{}",
            task.target_version,
            task.range.min_id(),
            task.range.max_id(),
            batches.len(),
            settings.batch_size,
            if settings.shuffle { ", shuffled" } else { "" }
        );

        let mut reason = TerminationReason::Completed;
        for batch in batches {
            info!("{kind} batch: [{} .. {}]", batch.min_id, batch.max_id);
            let outcome = self
                .authority
                .migrate_batch(kind, batch)
                .inspect_err(|err| warn!("{kind} run failed during batch: {err}"))?;
            debug!(
                "batch done: converted {}, failed {}",
                outcome.converted, outcome.failed
            );
            tally.record(outcome);

            if self.has_drifted(&task)? {
                reason = TerminationReason::VersionDrifted;
                break;
            }

            if let Some(limit) = settings.time_limit {
                if self.elapsed_since(started) >= limit {
                    reason = TerminationReason::TimeLimitReached;
                    break;
                }
            }
        }

        Ok(self.finish(tally, reason, started))
    }

    fn has_drifted(&self, task: &MigrationTask) -> Result<bool> {
        let current = self.store.current_target_version(task.kind)?;
        if current == Some(task.target_version) {
            return Ok(false);
        }
        match current {
            Some(version) => warn!(
                "Target {} changed: {} -> {}",
                task.kind, task.target_version, version
            ),
            None => warn!(
                "Target {} {} is no longer configured",
                task.kind, task.target_version
            ),
        }
        Ok(true)
    }

    fn elapsed_since(&self, started: Instant) -> Duration {
        self.clock.now().saturating_duration_since(started)
    }

    fn finish(&self, tally: RunTally, reason: TerminationReason, started: Instant) -> RunReport {
        let report = tally.finish(reason, self.elapsed_since(started));
        if reason.is_abort() {
            warn!("{report}");
        } else {
            info!("{report}");
        }
        report
    }
}
