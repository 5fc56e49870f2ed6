mod cli;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use partbench_compute::{
    compare_policies, run_experiment, run_pipeline, CsvTimingSink, ExperimentReport, TimingSink,
};
use partbench_core::config::load_dotenv;
use partbench_core::{generate, Dataset, DatasetShape, ExperimentConfig};

use crate::cli::{CliArgs, Command};

fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    // Defaults < config file < PARTBENCH_* env < flags
    let mut config = ExperimentConfig::load(args.config.as_deref()).with_context(|| {
        format!(
            "failed to load config: {}",
            args.config.as_deref().map(|p| p.display().to_string()).unwrap_or_default()
        )
    })?;
    config.apply_env();
    args.apply(&mut config);
    config.validate().context("invalid experiment configuration")?;
    config.log_summary();

    let shape = args.command.dataset().shape;
    let dataset = build_dataset(shape, &config)?;
    let workload = Arc::new(config.cost_model());

    match &args.command {
        Command::Rounds(rounds) => {
            let report = run_experiment(rounds.policy, &dataset, &config, workload)
                .context("experiment failed")?;
            print_report(&report, args.json)?;
            if config.measure {
                let mut sink = CsvTimingSink::create(&config.timings_path, config.workers)
                    .with_context(|| {
                        format!("failed to create {}", config.timings_path.display())
                    })?;
                sink.write_timings(&report.timings)
                    .context("failed to write timings")?;
                info!(path = %config.timings_path.display(), rows = report.timings.len(), "timings written");
            }
        }
        Command::Compare(_) => {
            let reports =
                compare_policies(&dataset, &config, workload).context("comparison failed")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                println!("{:<15} {:>12} {:>12}", "policy", "seconds", "result");
                for r in &reports {
                    println!(
                        "{:<15} {:>12.4} {:>12}",
                        r.policy.as_str(),
                        r.elapsed.as_secs_f64(),
                        r.result
                    );
                }
            }
            if reports.windows(2).any(|w| w[0].result != w[1].result) {
                bail!("policies disagree on the aggregate result");
            }
        }
        Command::Pipeline(_) => {
            let report =
                run_pipeline(&dataset, &config, workload).context("pipeline failed")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("nTasks: {}", report.tasks);
                println!("Time taken: {}", report.elapsed.as_secs_f64());
                if report.failures > 0 {
                    println!("Failed jobs: {}", report.failures);
                }
            }
        }
    }

    Ok(())
}

fn build_dataset(shape: DatasetShape, config: &ExperimentConfig) -> Result<Dataset> {
    info!(%shape, chunk_size = config.chunk_size, chunk_count = config.chunk_count, "generating dataset");
    generate(
        shape,
        config.chunk_size,
        config.chunk_count,
        config.heavy_probability,
        config.seed,
    )
    .context("failed to generate dataset")
}

fn print_report(report: &ExperimentReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("Processing took {} seconds", report.elapsed.as_secs_f64());
        println!("Result is {}", report.result);
    }
    Ok(())
}
