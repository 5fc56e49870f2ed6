use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use partbench_compute::PolicyKind;
use partbench_core::{DatasetShape, ExperimentConfig};

/// Static vs dynamic work partitioning benchmark.
///
/// Generates a batch of cheap and expensive synthetic tasks and pushes it
/// through a persistent worker pool, one chunk per round.
#[derive(Parser, Debug)]
#[command(name = "partbench", version, about)]
pub struct CliArgs {
    /// TOML file with experiment settings (flags override it)
    #[arg(long, global = true, env = "PARTBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the report as JSON instead of plain text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every chunk through one scheduling policy
    Rounds(RoundsArgs),
    /// Run the same dataset through all three policies
    Compare(DatasetArgs),
    /// Overlap simulated IO with compute on two task pools
    Pipeline(PipelineArgs),
}

impl Command {
    pub fn dataset(&self) -> &DatasetArgs {
        match self {
            Self::Rounds(a) => &a.dataset,
            Self::Compare(a) => a,
            Self::Pipeline(a) => &a.dataset,
        }
    }
}

#[derive(Args, Debug)]
pub struct RoundsArgs {
    /// preassigned, queued or atomic-queued
    #[arg(long, default_value = "atomic-queued")]
    pub policy: PolicyKind,

    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Record per-round timings and write them as CSV
    #[arg(long)]
    pub measure: bool,

    /// CSV output path for --measure
    #[arg(long)]
    pub timings: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PipelineArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[arg(long)]
    pub io_workers: Option<usize>,

    #[arg(long)]
    pub compute_workers: Option<usize>,

    /// Simulated IO latency per task, in milliseconds
    #[arg(long)]
    pub io_sleep_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct DatasetArgs {
    /// random, even or stacked
    #[arg(long, default_value = "random")]
    pub shape: DatasetShape,

    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(long)]
    pub chunk_size: Option<usize>,

    #[arg(long)]
    pub chunk_count: Option<usize>,

    #[arg(long)]
    pub light_iterations: Option<usize>,

    #[arg(long)]
    pub heavy_iterations: Option<usize>,

    #[arg(long)]
    pub heavy_probability: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,
}

impl CliArgs {
    /// Overlay every flag that was given onto `config`.
    pub fn apply(&self, config: &mut ExperimentConfig) {
        let d = self.command.dataset();
        if let Some(v) = d.workers {
            config.workers = v;
        }
        if let Some(v) = d.chunk_size {
            config.chunk_size = v;
        }
        if let Some(v) = d.chunk_count {
            config.chunk_count = v;
        }
        if let Some(v) = d.light_iterations {
            config.light_iterations = v;
        }
        if let Some(v) = d.heavy_iterations {
            config.heavy_iterations = v;
        }
        if let Some(v) = d.heavy_probability {
            config.heavy_probability = v;
        }
        if let Some(v) = d.seed {
            config.seed = v;
        }

        match &self.command {
            Command::Rounds(a) => {
                config.measure |= a.measure;
                if let Some(path) = &a.timings {
                    config.timings_path = path.clone();
                }
            }
            Command::Pipeline(a) => {
                if let Some(v) = a.io_workers {
                    config.io_workers = v;
                }
                if let Some(v) = a.compute_workers {
                    config.compute_workers = v;
                }
                if let Some(v) = a.io_sleep_ms {
                    config.io_sleep_ms = v;
                }
            }
            Command::Compare(_) => {
                if config.measure {
                    tracing::warn!("compare does not write per-round timings, ignoring measure");
                }
                config.measure = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn rounds_flags_override_config() {
        let args = CliArgs::try_parse_from([
            "partbench",
            "rounds",
            "--policy",
            "queued",
            "--shape",
            "stacked",
            "--workers",
            "8",
            "--chunk-size",
            "64",
            "--measure",
            "--timings",
            "out.csv",
        ])
        .unwrap();

        let Command::Rounds(rounds) = &args.command else {
            panic!("expected rounds subcommand");
        };
        assert_eq!(rounds.policy, PolicyKind::Queued);
        assert_eq!(rounds.dataset.shape, DatasetShape::Stacked);

        let mut config = ExperimentConfig::default();
        args.apply(&mut config);
        assert_eq!(config.workers, 8);
        assert_eq!(config.chunk_size, 64);
        assert_eq!(config.chunk_count, 1_000);
        assert!(config.measure);
        assert_eq!(config.timings_path, PathBuf::from("out.csv"));
    }

    #[test]
    fn pipeline_flags() {
        let args = CliArgs::try_parse_from([
            "partbench",
            "pipeline",
            "--io-workers",
            "16",
            "--io-sleep-ms",
            "0",
            "--json",
        ])
        .unwrap();
        assert!(args.json);
        let mut config = ExperimentConfig::default();
        args.apply(&mut config);
        assert_eq!(config.io_workers, 16);
        assert_eq!(config.io_sleep_ms, 0);
        assert_eq!(config.compute_workers, 4);
    }

    #[test]
    fn compare_turns_measurement_off() {
        let args = CliArgs::try_parse_from(["partbench", "compare", "--shape", "even"]).unwrap();
        let mut config = ExperimentConfig {
            measure: true,
            ..Default::default()
        };
        args.apply(&mut config);
        assert!(!config.measure);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(CliArgs::try_parse_from(["partbench", "rounds", "--policy", "stealing"]).is_err());
    }
}
