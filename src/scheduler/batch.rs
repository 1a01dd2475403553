//! Coalescing work-groups into CPU tasks.

use crate::sub_platform::cpu::MAX_TASK_BATCH_SIZE;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Split of a dispatch's work-groups into batches that workers claim
/// through a shared cursor.
#[derive(Debug)]
pub struct BatchPlan {
    total_groups: usize,
    batch_size: usize,
    num_batches: usize,
    cursor: AtomicUsize,
}

impl BatchPlan {
    /// The live batch size is the configured one, shrunk so that small grids
    /// still give every worker a batch, and never above
    /// [`MAX_TASK_BATCH_SIZE`].
    pub fn new(total_groups: usize, num_threads: usize, task_batch_size: usize) -> Self {
        let per_thread = total_groups.div_ceil(num_threads.max(1));
        let batch_size = task_batch_size
            .min(per_thread)
            .clamp(1, MAX_TASK_BATCH_SIZE);
        Self {
            total_groups,
            batch_size,
            num_batches: total_groups.div_ceil(batch_size),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn total_groups(&self) -> usize {
        self.total_groups
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_batches(&self) -> usize {
        self.num_batches
    }

    /// Tasks worth submitting: no more than there are batches.
    pub fn num_tasks(&self, num_threads: usize) -> usize {
        num_threads.min(self.num_batches)
    }

    /// Claim the next unprocessed batch of linear group ids.
    pub fn claim(&self) -> Option<Range<usize>> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        if index >= self.num_batches {
            return None;
        }
        let start = index * self.batch_size;
        Some(start..(start + self.batch_size).min(self.total_groups))
    }
}
