use std::ops::Range;

use partbench_core::{Chunk, Task};

use super::{subset_range, Policy};
use crate::scheduler::types::PolicyKind;

/// Static partitioning with a fixed worker → subset mapping.
///
/// Each worker knows its own range from construction. A round start only
/// hands every worker the chunk along with its wake-up; there is no
/// per-round assignment.
#[derive(Debug)]
pub struct Preassigned {
    ranges: Vec<Range<usize>>,
}

impl Preassigned {
    pub fn range_of(&self, worker: usize) -> Range<usize> {
        self.ranges[worker].clone()
    }
}

impl Policy for Preassigned {
    type Job = Chunk;

    const KIND: PolicyKind = PolicyKind::Preassigned;

    fn for_pool(workers: usize, chunk_size: usize) -> Self {
        let subset = chunk_size / workers;
        Self {
            ranges: (0..workers).map(|w| subset_range(w, subset)).collect(),
        }
    }

    fn begin_round(&self, _chunk: &Chunk) {}

    fn job_for(&self, chunk: &Chunk, _worker: usize) -> Chunk {
        chunk.clone()
    }

    fn drain<F: FnMut(&Task)>(&self, worker: usize, chunk: Chunk, visit: F) {
        chunk.subset(self.range_of(worker)).iter().for_each(visit);
    }
}
