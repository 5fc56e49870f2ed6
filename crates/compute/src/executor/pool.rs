use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle as ThreadHandle};

use crossbeam_channel::bounded;
use tracing::{debug, warn};

use super::handle::JobHandle;
use crate::error::{JobError, SchedulerError};
use crate::sync::{lock, panic_message, wait};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    /// Submitted and not yet finished executing. Decremented only after a
    /// job returns, never at dequeue.
    in_flight: usize,
    stop: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    job_ready: Condvar,
    idle: Condvar,
}

/// A fixed set of threads draining one FIFO job queue.
///
/// The pool is an ordinary owned value: whoever needs to submit work gets a
/// reference (or an `Arc`) to it, and dropping it stops and joins the
/// workers.
pub struct TaskPool {
    name: String,
    shared: Arc<Shared>,
    workers: Vec<ThreadHandle<()>>,
}

impl TaskPool {
    pub fn new(name: impl Into<String>, workers: usize) -> Result<Self, SchedulerError> {
        let name = name.into();
        if workers == 0 {
            return Err(SchedulerError::InvalidPool(format!(
                "task pool '{name}' needs at least one worker"
            )));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            job_ready: Condvar::new(),
            idle: Condvar::new(),
        });
        let mut pool = Self {
            name,
            shared,
            workers: Vec::with_capacity(workers),
        };
        for index in 0..workers {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("{}-{}", pool.name, index))
                .spawn(move || work_loop(&shared))
                .map_err(SchedulerError::Spawn)?;
            pool.workers.push(handle);
        }
        debug!(pool = %pool.name, workers, "task pool started");
        Ok(pool)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue `f` and return a handle to its result. Panics inside `f` are
    /// caught and delivered as [`JobError::Panicked`].
    pub fn submit<F, T>(&self, f: F) -> JobHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| JobError::Panicked(panic_message(payload.as_ref())));
            // The caller may have dropped its handle; nothing to report then.
            let _ = tx.send(outcome);
        });
        {
            let mut state = lock(&self.shared.state);
            state.jobs.push_back(job);
            state.in_flight += 1;
        }
        self.shared.job_ready.notify_one();
        JobHandle::new(rx)
    }

    /// Block until the queue is empty and no job is executing.
    pub fn wait_idle(&self) {
        let mut state = lock(&self.shared.state);
        while state.in_flight > 0 {
            state = wait(&self.shared.idle, state);
        }
    }

    /// Jobs submitted but not yet finished, including those running.
    pub fn in_flight(&self) -> usize {
        lock(&self.shared.state).in_flight
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        lock(&self.shared.state).stop = true;
        self.shared.job_ready.notify_all();

        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!(pool = %self.name, "task pool worker panicked");
            }
        }

        // Dropping unstarted jobs drops their senders; their handles see Disconnected.
        let abandoned = {
            let mut state = lock(&self.shared.state);
            let queued = state.jobs.len();
            state.in_flight -= queued;
            std::mem::take(&mut state.jobs)
        };
        if !abandoned.is_empty() {
            debug!(pool = %self.name, abandoned = abandoned.len(), "dropping unstarted jobs");
        }
        self.shared.idle.notify_all();
    }
}

fn work_loop(shared: &Shared) {
    loop {
        let job = {
            let mut state = lock(&shared.state);
            loop {
                if state.stop {
                    return;
                }
                if let Some(job) = state.jobs.pop_front() {
                    break job;
                }
                state = wait(&shared.job_ready, state);
            }
        };

        job();

        let mut state = lock(&shared.state);
        state.in_flight -= 1;
        if state.in_flight == 0 {
            shared.idle.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn returns_results() {
        let pool = TaskPool::new("test", 3).unwrap();
        let handles: Vec<_> = (0..20u32).map(|i| pool.submit(move || i * i)).collect();
        let results: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, (0..20u32).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn panics_become_errors() {
        let pool = TaskPool::new("test", 1).unwrap();
        let bad = pool.submit(|| -> u32 { panic!("boom") });
        let good = pool.submit(|| 7u32);
        assert_eq!(bad.join(), Err(JobError::Panicked("boom".into())));
        // The worker survives the panic.
        assert_eq!(good.join(), Ok(7));
    }

    #[test]
    fn wait_idle_waits_for_running_jobs() {
        let pool = TaskPool::new("test", 2).unwrap();
        let finished = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let finished = Arc::clone(&finished);
            // Handles dropped on purpose: completion is tracked by the pool.
            drop(pool.submit(move || {
                thread::sleep(Duration::from_millis(20));
                finished.fetch_add(1, Ordering::SeqCst);
            }));
        }
        pool.wait_idle();
        assert_eq!(finished.load(Ordering::SeqCst), 4);
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn wait_idle_on_fresh_pool_returns() {
        TaskPool::new("test", 1).unwrap().wait_idle();
    }

    #[test]
    fn unstarted_jobs_disconnect_on_drop() {
        let pool = TaskPool::new("test", 1).unwrap();
        let (started_tx, started_rx) = bounded(1);
        let first = pool.submit(move || {
            started_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
            1u32
        });
        started_rx.recv().unwrap();
        let mut second = pool.submit(|| 2u32);
        drop(pool);

        assert_eq!(first.join(), Ok(1));
        assert!(second.is_finished());
        assert_eq!(second.join(), Err(JobError::Disconnected));
    }

    #[test]
    fn try_join_returns_handle_until_ready() {
        let pool = TaskPool::new("test", 1).unwrap();
        let (go_tx, go_rx) = bounded::<()>(1);
        let handle = pool.submit(move || {
            go_rx.recv().unwrap();
            5u32
        });
        let mut handle = match handle.try_join() {
            Err(handle) => handle,
            Ok(_) => panic!("job finished before it was released"),
        };
        go_tx.send(()).unwrap();
        pool.wait_idle();
        assert!(handle.is_finished());
        assert_eq!(handle.try_join().ok(), Some(Ok(5)));
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(matches!(TaskPool::new("none", 0), Err(SchedulerError::InvalidPool(_))));
    }
}
