// src/partition.rs
//! Batch partitioner: splits an id range into fixed-size batches
//!
//! Ascending order is produced lazily by [`Batches`], so a sparse range with
//! a small batch size costs nothing up front. A shuffled plan has to hold
//! every batch in memory at once: roughly `id_count / batch_size` entries of
//! 16 bytes each.

use std::iter::FusedIterator;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::{Batch, IdRange};

/// Lazy ascending batches over an id range. See [`batches`].
#[derive(Debug, Clone)]
pub struct Batches {
    next: Option<i64>,
    max_id: i64,
    step: i64,
}

/// Split `range` into contiguous batches of at most `batch_size` ids, in
/// ascending order. Only the last batch may be shorter.
///
/// `batch_size` must be at least 1; `MigrationSettings` rejects 0 before a
/// run starts, here it is clamped so the function stays total.
pub fn batches(range: IdRange, batch_size: u64) -> Batches {
    Batches {
        next: Some(range.min_id()),
        max_id: range.max_id(),
        step: i64::try_from(batch_size.max(1)).unwrap_or(i64::MAX),
    }
}

impl Batches {
    /// Batches not yet yielded
    pub fn remaining(&self) -> u64 {
        match self.next {
            Some(lo) => {
                let ids = self.max_id.abs_diff(lo).saturating_add(1);
                ids.div_ceil(self.step.unsigned_abs())
            }
            None => 0,
        }
    }
}

impl Iterator for Batches {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let lo = self.next?;
        let hi = lo.saturating_add(self.step - 1).min(self.max_id);
        self.next = (hi < self.max_id).then(|| hi + 1);
        Some(Batch {
            min_id: lo,
            max_id: hi,
        })
    }

    // Saturates at usize::MAX on targets where the count does not fit
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Batches {}

impl FusedIterator for Batches {}

/// Every batch of [`batches`], collected
pub fn partition(range: IdRange, batch_size: u64) -> Vec<Batch> {
    batches(range, batch_size).collect()
}

/// Same batches as [`partition`], in a uniformly random order
pub fn partition_shuffled<R: Rng + ?Sized>(
    range: IdRange,
    batch_size: u64,
    rng: &mut R,
) -> Vec<Batch> {
    let mut batches = partition(range, batch_size);
    batches.shuffle(rng);
    batches
}

/// Batch order for one run
#[derive(Debug, Clone)]
pub enum Plan {
    Ascending(Batches),
    Shuffled(std::vec::IntoIter<Batch>),
}

impl Iterator for Plan {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        match self {
            Plan::Ascending(it) => it.next(),
            Plan::Shuffled(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Plan::Ascending(it) => it.size_hint(),
            Plan::Shuffled(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for Plan {}

/// Plan the batch order for a run. Only the shuffled plan is materialized.
pub fn plan<R: Rng + ?Sized>(
    range: IdRange,
    batch_size: u64,
    shuffle: bool,
    rng: &mut R,
) -> Plan {
    if shuffle {
        Plan::Shuffled(partition_shuffled(range, batch_size, rng).into_iter())
    } else {
        Plan::Ascending(batches(range, batch_size))
    }
}
