use std::sync::{Condvar, Mutex};

use crate::sync::{lock, wait};

#[derive(Debug, Default)]
struct LatchState {
    /// A round has been started and its completion not yet observed.
    open: bool,
    /// Workers that reported done for the open round.
    done: usize,
}

/// Round-completion detection shared by the driver and every worker.
///
/// The Nth `signal_done` wakes the driver blocked in `wait_all_done`, which
/// resets the counter before returning so the next round can open.
#[derive(Debug)]
pub(crate) struct RoundLatch {
    workers: usize,
    state: Mutex<LatchState>,
    all_done: Condvar,
}

impl RoundLatch {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            state: Mutex::new(LatchState::default()),
            all_done: Condvar::new(),
        }
    }

    /// Mark a round as started. Panics if the previous one is still open.
    pub fn open(&self) {
        let mut state = lock(&self.state);
        assert!(
            !state.open,
            "round started before the previous round's completion was observed"
        );
        state.open = true;
        state.done = 0;
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    pub fn signal_done(&self) {
        let notify = {
            let mut state = lock(&self.state);
            state.done += 1;
            debug_assert!(state.done <= self.workers, "more done reports than workers");
            state.done == self.workers
        };
        if notify {
            self.all_done.notify_one();
        }
    }

    /// Block until every worker reported done, then close the round.
    pub fn wait_all_done(&self) {
        let mut state = lock(&self.state);
        assert!(state.open, "waited for a round that was never started");
        while state.done < self.workers {
            state = wait(&self.all_done, state);
        }
        state.done = 0;
        state.open = false;
    }
}
