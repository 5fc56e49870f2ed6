use partbench_core::BenchError;
use thiserror::Error;

/// Errors surfaced while building pools or persisting results.
///
/// Contract violations inside a round (starting a round twice, feeding a
/// chunk of the wrong length) are not represented here; they panic.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid pool configuration: {0}")]
    InvalidPool(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("worker {worker} panicked during a round: {message}")]
    WorkerPanicked { worker: usize, message: String },

    #[error(transparent)]
    Core(#[from] BenchError),

    #[error("timing sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure half of a job result delivered through a [`crate::JobHandle`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job panicked: {0}")]
    Panicked(String),

    #[error("job was dropped before it ran")]
    Disconnected,
}
