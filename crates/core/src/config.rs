use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BenchError, Result};
use crate::task::CostModel;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_opt(key).and_then(|v| v.parse().ok())
}

/// Plain configuration record for one benchmark run.
///
/// The scheduling core never parses anything itself; the binary assembles
/// this from defaults, an optional TOML file, `PARTBENCH_*` env vars and
/// command-line flags, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Worker threads in the round-based pool.
    pub workers: usize,
    /// Tasks per chunk. Must be a multiple of `workers`.
    pub chunk_size: usize,
    /// Chunks (rounds) per run.
    pub chunk_count: usize,
    pub light_iterations: usize,
    pub heavy_iterations: usize,
    pub heavy_probability: f64,
    /// Base seed for dataset generation.
    pub seed: u64,
    /// Record per-round timings.
    pub measure: bool,
    /// Where the CSV timing sink writes when `measure` is on.
    pub timings_path: PathBuf,
    /// IO pool size for the pipeline experiment.
    pub io_workers: usize,
    /// Compute pool size for the pipeline experiment.
    pub compute_workers: usize,
    /// Simulated IO latency per task in the pipeline experiment.
    pub io_sleep_ms: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let cost = CostModel::default();
        Self {
            workers: 4,
            chunk_size: 16_000,
            chunk_count: 1_000,
            light_iterations: cost.light_iterations,
            heavy_iterations: cost.heavy_iterations,
            heavy_probability: 0.15,
            seed: 1,
            measure: false,
            timings_path: PathBuf::from("timings.csv"),
            io_workers: 32,
            compute_workers: 4,
            io_sleep_ms: 1,
        }
    }
}

impl ExperimentConfig {
    /// Read a TOML file. Missing keys fall back to defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        debug!(?path, "Loading config");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults, overlaid by `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_toml_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Overlay any `PARTBENCH_*` environment variables that parse.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse("PARTBENCH_WORKERS") {
            self.workers = v;
        }
        if let Some(v) = env_parse("PARTBENCH_CHUNK_SIZE") {
            self.chunk_size = v;
        }
        if let Some(v) = env_parse("PARTBENCH_CHUNK_COUNT") {
            self.chunk_count = v;
        }
        if let Some(v) = env_parse("PARTBENCH_LIGHT_ITERATIONS") {
            self.light_iterations = v;
        }
        if let Some(v) = env_parse("PARTBENCH_HEAVY_ITERATIONS") {
            self.heavy_iterations = v;
        }
        if let Some(v) = env_parse("PARTBENCH_HEAVY_PROBABILITY") {
            self.heavy_probability = v;
        }
        if let Some(v) = env_parse("PARTBENCH_SEED") {
            self.seed = v;
        }
        if let Some(v) = env_parse("PARTBENCH_MEASURE") {
            self.measure = v;
        }
        if let Some(v) = env_opt("PARTBENCH_TIMINGS_PATH") {
            self.timings_path = PathBuf::from(v);
        }
        if let Some(v) = env_parse("PARTBENCH_IO_WORKERS") {
            self.io_workers = v;
        }
        if let Some(v) = env_parse("PARTBENCH_COMPUTE_WORKERS") {
            self.compute_workers = v;
        }
        if let Some(v) = env_parse("PARTBENCH_IO_SLEEP_MS") {
            self.io_sleep_ms = v;
        }
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.light_iterations, self.heavy_iterations)
    }

    /// Tasks each worker owns per round under the static policies.
    pub fn subset_size(&self) -> usize {
        self.chunk_size / self.workers.max(1)
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_partitioning()?;
        self.validate_probability()?;
        self.validate_pools()?;
        Ok(())
    }

    /// Chunks must split into equal per-worker subsets.
    fn validate_partitioning(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(BenchError::Config("workers must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(BenchError::Config("chunk_size must be at least 1".into()));
        }
        if self.chunk_size < self.workers {
            return Err(BenchError::Config(format!(
                "chunk_size {} is smaller than worker count {}",
                self.chunk_size, self.workers
            )));
        }
        if self.chunk_size % self.workers != 0 {
            return Err(BenchError::Config(format!(
                "chunk_size {} is not divisible by worker count {}",
                self.chunk_size, self.workers
            )));
        }
        if self.chunk_count == 0 {
            return Err(BenchError::Config("chunk_count must be at least 1".into()));
        }
        Ok(())
    }

    fn validate_probability(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.heavy_probability) {
            return Err(BenchError::Config(format!(
                "heavy_probability must be within [0, 1], got {}",
                self.heavy_probability
            )));
        }
        Ok(())
    }

    fn validate_pools(&self) -> Result<()> {
        if self.io_workers == 0 || self.compute_workers == 0 {
            return Err(BenchError::Config(
                "io_workers and compute_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  rounds:   workers={}, chunk_size={} ({} per worker), chunk_count={}",
            self.workers,
            self.chunk_size,
            self.subset_size(),
            self.chunk_count
        );
        tracing::info!(
            "  workload: light={}, heavy={}, p_heavy={}, seed={}",
            self.light_iterations,
            self.heavy_iterations,
            self.heavy_probability,
            self.seed
        );
        tracing::info!(
            "  timing:   measure={}, path={}",
            self.measure,
            self.timings_path.display()
        );
        tracing::info!(
            "  pipeline: io_workers={}, compute_workers={}, io_sleep_ms={}",
            self.io_workers,
            self.compute_workers,
            self.io_sleep_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ExperimentConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.chunk_size, 16_000);
        assert_eq!(config.chunk_count, 1_000);
        assert_eq!(config.subset_size(), 4_000);
        assert_eq!(config.cost_model(), CostModel::new(2, 20));
        config.validate().unwrap();
    }

    #[test]
    fn rejects_non_divisible_chunk() {
        let config = ExperimentConfig {
            workers: 3,
            chunk_size: 16,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not divisible"), "{err}");
    }

    #[test]
    fn rejects_chunk_smaller_than_pool() {
        let config = ExperimentConfig {
            workers: 8,
            chunk_size: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_sizes() {
        for config in [
            ExperimentConfig { workers: 0, ..Default::default() },
            ExperimentConfig { chunk_size: 0, ..Default::default() },
            ExperimentConfig { chunk_count: 0, ..Default::default() },
            ExperimentConfig { io_workers: 0, ..Default::default() },
            ExperimentConfig { compute_workers: 0, ..Default::default() },
        ] {
            assert!(matches!(config.validate(), Err(BenchError::Config(_))));
        }
    }

    #[test]
    fn rejects_bad_probability() {
        let config = ExperimentConfig {
            heavy_probability: 1.01,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn single_worker_and_one_task_per_worker_are_valid() {
        ExperimentConfig { workers: 1, chunk_size: 7, ..Default::default() }
            .validate()
            .unwrap();
        ExperimentConfig { workers: 4, chunk_size: 4, ..Default::default() }
            .validate()
            .unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            workers = 8
            chunk_size = 64
            measure = true
            "#,
        )
        .unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.chunk_size, 64);
        assert!(config.measure);
        assert_eq!(config.chunk_count, 1_000);
        assert_eq!(config.heavy_probability, 0.15);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = ExperimentConfig::from_toml_str("workers = \"many\"").unwrap_err();
        assert!(matches!(err, BenchError::ConfigParse(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partbench.toml");
        std::fs::write(&path, "chunk_count = 3\nseed = 99\n").unwrap();

        let config = ExperimentConfig::load(Some(&path)).unwrap();
        assert_eq!(config.chunk_count, 3);
        assert_eq!(config.seed, 99);

        assert_eq!(ExperimentConfig::load(None).unwrap(), ExperimentConfig::default());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExperimentConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, BenchError::Io(_)));
    }
}
