//! Task-assignment policies.
//!
//! A policy decides what a worker receives with its round-start signal and
//! how it walks the chunk afterwards. The worker loop, completion latch and
//! driver are shared; only these two hooks differ.

mod atomic_queued;
mod preassigned;
mod queued;

pub use atomic_queued::AtomicQueued;
pub use preassigned::Preassigned;
pub use queued::{Queued, Subset};

use partbench_core::{Chunk, Task};

use super::types::PolicyKind;

pub trait Policy: Send + Sync + Sized + 'static {
    /// Delivered to one worker together with its round-start signal.
    type Job: Send + 'static;

    const KIND: PolicyKind;

    /// Build the policy for a pool of `workers` over chunks of `chunk_size`.
    /// The pool has already checked that `chunk_size` splits evenly.
    fn for_pool(workers: usize, chunk_size: usize) -> Self;

    /// Publish round state before any worker is woken.
    fn begin_round(&self, chunk: &Chunk);

    /// The job for worker `worker` this round.
    fn job_for(&self, chunk: &Chunk, worker: usize) -> Self::Job;

    /// Run on the worker thread: visit every task this worker owns or claims.
    fn drain<F: FnMut(&Task)>(&self, worker: usize, job: Self::Job, visit: F);
}

/// Contiguous index range of worker `worker` under equal static splitting.
pub(crate) fn subset_range(worker: usize, subset: usize) -> std::ops::Range<usize> {
    let start = worker * subset;
    start..start + subset
}
