use std::sync::Arc;
use std::thread::{self, JoinHandle};

use partbench_core::{Chunk, Workload};
use tracing::{debug, warn};

use super::latch::RoundLatch;
use super::metrics::WorkerStats;
use super::policy::Policy;
use super::worker::{RoundWorker, WorkerSlot};
use crate::error::SchedulerError;

/// A fixed pool of long-lived worker threads driven round by round.
///
/// The owning thread calls [`start_round`](Self::start_round) once per
/// chunk, then [`wait_round_done`](Self::wait_round_done). Workers are spawned
/// once and joined on [`shutdown`](Self::shutdown) or drop.
pub struct WorkerPool<P: Policy> {
    policy: Arc<P>,
    latch: Arc<RoundLatch>,
    slots: Vec<Arc<WorkerSlot<P::Job>>>,
    handles: Vec<JoinHandle<()>>,
    chunk_size: usize,
}

impl<P: Policy> WorkerPool<P> {
    /// Spawn `workers` threads for chunks of exactly `chunk_size` tasks.
    ///
    /// `chunk_size` must be a non-zero multiple of `workers`.
    pub fn new<W: Workload>(
        workers: usize,
        chunk_size: usize,
        workload: Arc<W>,
        measure: bool,
    ) -> Result<Self, SchedulerError> {
        if workers == 0 {
            return Err(SchedulerError::InvalidPool(
                "cannot create a pool with 0 workers".into(),
            ));
        }
        if chunk_size < workers || chunk_size % workers != 0 {
            return Err(SchedulerError::InvalidPool(format!(
                "chunk size {chunk_size} does not split evenly across {workers} workers"
            )));
        }

        let policy = Arc::new(P::for_pool(workers, chunk_size));
        let latch = Arc::new(RoundLatch::new(workers));
        let mut pool = Self {
            policy,
            latch,
            slots: Vec::with_capacity(workers),
            handles: Vec::with_capacity(workers),
            chunk_size,
        };

        for index in 0..workers {
            let slot = Arc::new(WorkerSlot::new());
            let worker = RoundWorker {
                index,
                slot: Arc::clone(&slot),
                policy: Arc::clone(&pool.policy),
                latch: Arc::clone(&pool.latch),
                workload: Arc::clone(&workload),
                measure,
            };
            // On error `pool` drops here and joins the workers already spawned.
            let handle = thread::Builder::new()
                .name(format!("{}-worker-{}", P::KIND, index))
                .spawn(move || worker.run())
                .map_err(SchedulerError::Spawn)?;
            pool.slots.push(slot);
            pool.handles.push(handle);
        }

        debug!(policy = %P::KIND, workers, chunk_size, "worker pool started");
        Ok(pool)
    }

    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Make `chunk` visible to the workers and wake them.
    ///
    /// # Panics
    /// If the previous round's completion has not been observed with
    /// [`wait_round_done`](Self::wait_round_done), or if the chunk length is
    /// not the pool's chunk size.
    pub fn start_round(&self, chunk: &Chunk) {
        assert_eq!(
            chunk.len(),
            self.chunk_size,
            "chunk length does not match the pool's chunk size"
        );
        self.latch.open();
        self.policy.begin_round(chunk);
        for (index, slot) in self.slots.iter().enumerate() {
            slot.start(self.policy.job_for(chunk, index));
        }
    }

    /// Block until every worker finished the current round.
    ///
    /// Fails with [`SchedulerError::WorkerPanicked`] if the workload panicked
    /// on any worker; the round is closed either way and the pool stays usable.
    pub fn wait_round_done(&self) -> Result<(), SchedulerError> {
        self.latch.wait_all_done();
        match self
            .slots
            .iter()
            .enumerate()
            .find_map(|(worker, slot)| slot.round_panic().map(|m| (worker, m)))
        {
            Some((worker, message)) => Err(SchedulerError::WorkerPanicked { worker, message }),
            None => Ok(()),
        }
    }

    pub fn run_round(&self, chunk: &Chunk) -> Result<(), SchedulerError> {
        self.start_round(chunk);
        self.wait_round_done()
    }

    /// Per-worker snapshots, in worker order.
    ///
    /// # Panics
    /// While a round is in progress.
    pub fn stats(&self) -> Vec<WorkerStats> {
        assert!(
            !self.latch.is_open(),
            "worker stats read while a round is in progress"
        );
        self.slots.iter().map(|s| s.stats()).collect()
    }

    /// Sum of every worker's accumulation so far.
    pub fn result(&self) -> u32 {
        self.stats()
            .iter()
            .fold(0u32, |acc, s| acc.wrapping_add(s.accumulation))
    }

    /// Stop every worker and join it.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        for slot in &self.slots {
            slot.request_stop();
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!(policy = %P::KIND, "worker thread panicked");
            }
        }
    }
}

impl<P: Policy> Drop for WorkerPool<P> {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
