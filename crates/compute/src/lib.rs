pub mod error;
pub mod executor;
pub mod scheduler;
mod sync;

pub use error::{JobError, SchedulerError};
pub use executor::{run_pipeline, Executors, JobHandle, PipelineReport, TaskPool};
pub use scheduler::{
    compare_policies, run_experiment, AtomicQueued, ChunkTiming, CsvTimingSink, ExperimentReport,
    Policy, PolicyKind, Preassigned, Queued, TimingSink, WorkerPool, WorkerStats,
};
