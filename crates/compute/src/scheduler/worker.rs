//! Persistent round worker.
//!
//! A worker is Idle (blocked on its mailbox), Active (draining the job it
//! was handed) or Terminated. It folds the round into its stats before
//! reporting done, and only then goes back to its mailbox, so it can never
//! pull round N+1 work before round N was reported.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use partbench_core::Workload;
use tracing::{error, trace};

use super::latch::RoundLatch;
use super::metrics::{RoundTally, WorkerStats};
use super::policy::Policy;
use crate::sync::{lock, panic_message, wait};

#[derive(Debug)]
struct Mailbox<J> {
    job: Option<J>,
    stop: bool,
}

/// State the driver shares with one worker thread.
#[derive(Debug)]
pub(crate) struct WorkerSlot<J> {
    mailbox: Mutex<Mailbox<J>>,
    wake: Condvar,
    stats: Mutex<WorkerStats>,
}

impl<J> WorkerSlot<J> {
    pub fn new() -> Self {
        Self {
            mailbox: Mutex::new(Mailbox {
                job: None,
                stop: false,
            }),
            wake: Condvar::new(),
            stats: Mutex::new(WorkerStats::default()),
        }
    }

    /// Hand over this round's job and wake the worker.
    pub fn start(&self, job: J) {
        {
            let mut mailbox = lock(&self.mailbox);
            assert!(
                mailbox.job.is_none(),
                "worker handed a new job before finishing the last one"
            );
            mailbox.job = Some(job);
        }
        self.wake.notify_one();
    }

    pub fn request_stop(&self) {
        lock(&self.mailbox).stop = true;
        self.wake.notify_one();
    }

    pub fn stats(&self) -> WorkerStats {
        lock(&self.stats).clone()
    }

    pub fn round_panic(&self) -> Option<String> {
        lock(&self.stats).round_panic.clone()
    }

    /// Idle wait. A pending job wins over a stop request, so a round that
    /// was started is always drained.
    fn next_job(&self) -> Option<J> {
        let mut mailbox = lock(&self.mailbox);
        loop {
            if let Some(job) = mailbox.job.take() {
                return Some(job);
            }
            if mailbox.stop {
                return None;
            }
            mailbox = wait(&self.wake, mailbox);
        }
    }
}

/// Everything a worker thread needs, moved into it at spawn.
pub(crate) struct RoundWorker<P: Policy, W: Workload> {
    pub index: usize,
    pub slot: Arc<WorkerSlot<P::Job>>,
    pub policy: Arc<P>,
    pub latch: Arc<RoundLatch>,
    pub workload: Arc<W>,
    pub measure: bool,
}

impl<P: Policy, W: Workload> RoundWorker<P, W> {
    pub fn run(self) {
        while let Some(job) = self.slot.next_job() {
            let started = self.measure.then(Instant::now);

            let mut tally = RoundTally::default();
            let workload = &*self.workload;
            // A panicking workload must still report done, or the driver blocks forever.
            let panic = panic::catch_unwind(AssertUnwindSafe(|| {
                self.policy.drain(self.index, job, |task| {
                    tally.add(workload.process(task), task.heavy);
                });
            }))
            .err()
            .map(|payload| panic_message(payload.as_ref()));
            if let Some(message) = &panic {
                error!(worker = self.index, %message, "workload panicked, round left incomplete");
            }

            let active = started.map_or(Duration::ZERO, |t| t.elapsed());
            lock(&self.slot.stats).finish_round(tally, active, panic);
            trace!(worker = self.index, tasks = tally.tasks, heavy = tally.heavy, "round drained");

            self.latch.signal_done();
        }
        trace!(worker = self.index, "worker stopped");
    }
}
