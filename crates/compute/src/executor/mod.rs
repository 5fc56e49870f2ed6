//! General-purpose job pool and the IO/compute pipeline experiment.
//!
//! Unlike the round pool, a [`TaskPool`] runs arbitrary closures from a
//! shared FIFO queue and hands each result back through its own
//! [`JobHandle`].

mod handle;
mod pipeline;
mod pool;

pub use handle::JobHandle;
pub use pipeline::{run_pipeline, Executors, PipelineReport};
pub use pool::TaskPool;
