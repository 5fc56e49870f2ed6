//! Round-based worker pool and the three task-assignment policies.
//!
//! The driver owns a [`WorkerPool`] for a whole run. Each chunk is one round:
//! `start_round` publishes the work and wakes every worker, `wait_round_done`
//! blocks until the last worker reports. Policies only decide how a worker
//! finds its tasks inside the round.

mod latch;
pub mod metrics;
pub mod policy;
pub mod pool;
pub mod runner;
pub mod timing;
pub mod types;
mod worker;

pub use metrics::{ChunkTiming, WorkerStats};
pub use policy::{AtomicQueued, Policy, Preassigned, Queued, Subset};
pub use pool::WorkerPool;
pub use runner::{compare_policies, run_experiment, ExperimentReport};
pub use timing::{CsvTimingSink, TimingSink};
pub use types::PolicyKind;
