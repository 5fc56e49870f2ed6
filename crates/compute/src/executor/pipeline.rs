//! Two-stage pipeline: every task first waits out a simulated IO latency on
//! the IO pool, then hands its evaluation to the compute pool and blocks on
//! the result.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use partbench_core::{Dataset, ExperimentConfig, Workload};
use serde::Serialize;
use tracing::{info, warn};

use super::handle::JobHandle;
use super::pool::TaskPool;
use crate::error::{JobError, SchedulerError};

/// The two pools of the pipeline experiment, owned by the caller.
///
/// Field order matters: the IO pool drops (and joins) first, because its
/// jobs block on compute handles.
pub struct Executors {
    pub io: TaskPool,
    pub compute: Arc<TaskPool>,
}

impl Executors {
    pub fn new(io_workers: usize, compute_workers: usize) -> Result<Self, SchedulerError> {
        Ok(Self {
            io: TaskPool::new("io", io_workers)?,
            compute: Arc::new(TaskPool::new("compute", compute_workers)?),
        })
    }

    /// Sleep for `latency` on the IO pool, then run `work` on the compute
    /// pool and wait for it.
    pub fn io_then_compute<F, T>(&self, latency: Duration, work: F) -> JobHandle<Result<T, JobError>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let compute = Arc::clone(&self.compute);
        self.io.submit(move || {
            if !latency.is_zero() {
                thread::sleep(latency);
            }
            compute.submit(work).join()
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub tasks: usize,
    pub failures: usize,
    /// Wrapping sum over every task that completed.
    pub result: u32,
    pub elapsed: Duration,
}

/// Push every task of `dataset` through the IO and compute pools.
pub fn run_pipeline<W: Workload>(
    dataset: &Dataset,
    config: &ExperimentConfig,
    workload: Arc<W>,
) -> Result<PipelineReport, SchedulerError> {
    let executors = Executors::new(config.io_workers, config.compute_workers)?;
    let latency = Duration::from_millis(config.io_sleep_ms);
    let started = Instant::now();

    let handles: Vec<_> = dataset
        .iter()
        .flat_map(|chunk| (0..chunk.len()).map(move |i| (chunk.clone(), i)))
        .map(|(chunk, i)| {
            let workload = Arc::clone(&workload);
            executors.io_then_compute(latency, move || workload.process(&chunk[i]))
        })
        .collect();

    let tasks = handles.len();
    let mut failures = 0;
    let mut result = 0u32;
    for handle in handles {
        match handle.join().and_then(|inner| inner) {
            Ok(value) => result = result.wrapping_add(value),
            Err(e) => {
                failures += 1;
                warn!(error = %e, "pipeline job failed");
            }
        }
    }
    let elapsed = started.elapsed();
    drop(executors);

    info!(
        tasks,
        failures,
        result,
        io_workers = config.io_workers,
        compute_workers = config.compute_workers,
        elapsed_secs = elapsed.as_secs_f64(),
        "pipeline finished"
    );
    Ok(PipelineReport {
        tasks,
        failures,
        result,
        elapsed,
    })
}
