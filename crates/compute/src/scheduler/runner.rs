//! Experiment driver: one pool, one round per chunk.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use partbench_core::{Dataset, ExperimentConfig, Workload};
use serde::Serialize;
use tracing::{debug, info};

use super::metrics::ChunkTiming;
use super::policy::{AtomicQueued, Policy, Preassigned, Queued};
use super::pool::WorkerPool;
use super::types::PolicyKind;
use crate::error::SchedulerError;

/// Outcome of running every chunk of a dataset through one policy.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub policy: PolicyKind,
    pub workers: usize,
    pub chunks: usize,
    /// Wrapping sum of every worker's accumulation.
    pub result: u32,
    /// Wall time from pool creation to the last round's completion.
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    /// One record per chunk; empty unless measurement was enabled.
    #[serde(skip)]
    pub timings: Vec<ChunkTiming>,
}

/// Run `dataset` through the policy selected by `kind`.
pub fn run_experiment<W: Workload>(
    kind: PolicyKind,
    dataset: &Dataset,
    config: &ExperimentConfig,
    workload: Arc<W>,
) -> Result<ExperimentReport, SchedulerError> {
    match kind {
        PolicyKind::Preassigned => run_rounds::<Preassigned, W>(dataset, config, workload),
        PolicyKind::Queued => run_rounds::<Queued, W>(dataset, config, workload),
        PolicyKind::AtomicQueued => run_rounds::<AtomicQueued, W>(dataset, config, workload),
    }
}

/// Run the same dataset through every policy, in [`PolicyKind::ALL`] order.
pub fn compare_policies<W: Workload>(
    dataset: &Dataset,
    config: &ExperimentConfig,
    workload: Arc<W>,
) -> Result<Vec<ExperimentReport>, SchedulerError> {
    PolicyKind::ALL
        .iter()
        .map(|&kind| run_experiment(kind, dataset, config, Arc::clone(&workload)))
        .collect()
}

fn run_rounds<P: Policy, W: Workload>(
    dataset: &Dataset,
    config: &ExperimentConfig,
    workload: Arc<W>,
) -> Result<ExperimentReport, SchedulerError> {
    let started_at = Utc::now();
    let total = Instant::now();

    let pool = WorkerPool::<P>::new(config.workers, dataset.chunk_size(), workload, config.measure)?;
    let mut timings = Vec::with_capacity(if config.measure { dataset.len() } else { 0 });

    for (round, chunk) in dataset.iter().enumerate() {
        let round_start = config.measure.then(Instant::now);
        pool.start_round(chunk);
        pool.wait_round_done()?;

        if let Some(start) = round_start {
            let timing = ChunkTiming::from_stats(&pool.stats(), start.elapsed());
            debug!(
                round,
                total_ms = timing.total.as_secs_f64() * 1e3,
                idle_ms = timing.total_idle().as_secs_f64() * 1e3,
                "round complete"
            );
            timings.push(timing);
        }
    }

    let elapsed = total.elapsed();
    let result = pool.result();
    pool.shutdown();

    info!(
        policy = %P::KIND,
        workers = config.workers,
        chunks = dataset.len(),
        elapsed_secs = elapsed.as_secs_f64(),
        result,
        "experiment finished"
    );

    Ok(ExperimentReport {
        policy: P::KIND,
        workers: config.workers,
        chunks: dataset.len(),
        result,
        elapsed,
        started_at,
        timings,
    })
}
