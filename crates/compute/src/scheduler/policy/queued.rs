use std::ops::Range;

use partbench_core::{Chunk, Task};

use super::{subset_range, Policy};
use crate::scheduler::types::PolicyKind;

/// A worker's share of one round under [`Queued`].
#[derive(Debug, Clone)]
pub struct Subset {
    pub chunk: Chunk,
    pub range: Range<usize>,
}

/// Static partitioning dispatched per round.
///
/// Produces the same subsets as [`super::Preassigned`], but the driver
/// recomputes each range and pushes it into the worker's mailbox every round.
#[derive(Debug)]
pub struct Queued {
    subset: usize,
}

impl Policy for Queued {
    type Job = Subset;

    const KIND: PolicyKind = PolicyKind::Queued;

    fn for_pool(workers: usize, chunk_size: usize) -> Self {
        Self {
            subset: chunk_size / workers,
        }
    }

    fn begin_round(&self, _chunk: &Chunk) {}

    fn job_for(&self, chunk: &Chunk, worker: usize) -> Subset {
        Subset {
            chunk: chunk.clone(),
            range: subset_range(worker, self.subset),
        }
    }

    fn drain<F: FnMut(&Task)>(&self, _worker: usize, job: Subset, visit: F) {
        job.chunk.subset(job.range).iter().for_each(visit);
    }
}
