use std::sync::Mutex;

use partbench_core::{Chunk, Task};

use super::Policy;
use crate::scheduler::types::PolicyKind;
use crate::sync::lock;

#[derive(Debug, Default)]
struct Cursor {
    next: usize,
    len: usize,
}

/// Dynamic partitioning through one shared cursor.
///
/// Idle workers call [`AtomicQueued::claim_next`] until it runs dry. The
/// increment-and-bounds-check happens under the cursor mutex, so indices are
/// handed out in increasing order and never twice. Task evaluation happens
/// outside the lock.
#[derive(Debug, Default)]
pub struct AtomicQueued {
    cursor: Mutex<Cursor>,
}

impl AtomicQueued {
    /// Claim the next unprocessed index of the current chunk.
    pub fn claim_next(&self) -> Option<usize> {
        let mut cursor = lock(&self.cursor);
        let index = cursor.next;
        cursor.next += 1;
        (index < cursor.len).then_some(index)
    }
}

impl Policy for AtomicQueued {
    type Job = Chunk;

    const KIND: PolicyKind = PolicyKind::AtomicQueued;

    fn for_pool(_workers: usize, _chunk_size: usize) -> Self {
        Self::default()
    }

    fn begin_round(&self, chunk: &Chunk) {
        let mut cursor = lock(&self.cursor);
        cursor.next = 0;
        cursor.len = chunk.len();
    }

    fn job_for(&self, chunk: &Chunk, _worker: usize) -> Chunk {
        chunk.clone()
    }

    fn drain<F: FnMut(&Task)>(&self, _worker: usize, chunk: Chunk, mut visit: F) {
        while let Some(index) = self.claim_next() {
            visit(&chunk[index]);
        }
    }
}
