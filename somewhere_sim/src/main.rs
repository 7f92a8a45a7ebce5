//! Somewhere Simulator CLI
//!
//! Runs the reference scenarios, a single configured run, or batch sweeps.

use clap::Parser;
use somewhere_sim::batch::{run_batch, BatchExport, BatchPlan, SweepParam};
use somewhere_sim::scenarios::ScenarioId;
use somewhere_sim::{ScenarioResult, ScenarioRunner, SimConfig, SimError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Somewhere strategy simulator
#[derive(Parser, Debug)]
#[command(name = "somewhere-sim")]
#[command(about = "Simulate and compare the somewhere strategies", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time) [default: 42]
    #[arg(short, long)]
    seed: Option<u64>,

    /// Scenario to run (single_device, line, grid, partition, churn, random_walk, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to run each scenario with
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Run this simulation configuration (JSON) instead of a scenario
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run batch sweeps instead of scenarios
    #[arg(long)]
    batch: bool,

    /// Parameter to sweep in batch mode (speed, dens, hops, tvar); all if omitted
    #[arg(long)]
    param: Option<String>,

    /// Concurrent runs in batch mode
    #[arg(long, default_value = "4")]
    parallelism: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export rows (single run) or batch results to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG wins over --verbose
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Somewhere Simulator v{}", env!("CARGO_PKG_VERSION"));
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether everything passed.
fn run(args: &Args) -> Result<bool, SimError> {
    let base_seed = match args.seed {
        Some(0) => std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1),
        Some(seed) => seed,
        None => 42,
    };

    if args.batch {
        return run_batch_mode(args, base_seed);
    }
    if let Some(path) = &args.config {
        return run_config_mode(args, path, base_seed);
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().map_err(SimError::InvalidSim)?]
    };
    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        return Err(SimError::invalid("--export only supports a single scenario and seed"));
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed);

        for scenario in &scenarios {
            let result = runner.run(*scenario);
            if !args.json {
                report(&result);
            }
            all_results.push(result);
        }
    }

    if let (Some(path), Some(result)) = (&args.export, all_results.first()) {
        result.to_export().write_to_file(path)?;
        info!("Exported {} rows to {}", result.rows.len(), path.display());
    }

    summarize(args, &all_results)
}

/// Runs a JSON simulation configuration with the common checks.
fn run_config_mode(args: &Args, path: &Path, seed: u64) -> Result<bool, SimError> {
    let text = std::fs::read_to_string(path)?;
    let mut config: SimConfig = serde_json::from_str(&text)?;
    // The file's seed unless one was given
    if args.seed.is_some() {
        config.seed = seed;
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "custom".to_string());
    info!("Running {} ({} devices, seed={})", name, config.devices, config.seed);

    let result = ScenarioRunner::new(config.seed).run_config(&name, config)?;
    if !args.json {
        report(&result);
    }
    if let Some(export) = &args.export {
        result.to_export().write_to_file(export)?;
        info!("Exported {} rows to {}", result.rows.len(), export.display());
    }
    summarize(args, std::slice::from_ref(&result))
}

/// Runs batch sweeps on a multi-thread runtime.
fn run_batch_mode(args: &Args, base_seed: u64) -> Result<bool, SimError> {
    let params = match &args.param {
        Some(p) => vec![p.parse::<SweepParam>().map_err(SimError::InvalidSim)?],
        None => SweepParam::all().to_vec(),
    };
    let seeds = base_seed..base_seed.saturating_add(args.seeds.max(1) as u64);
    let points = BatchPlan::new(seeds).points(&params);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let results = runtime.block_on(run_batch(points, args.parallelism))?;
    let export = BatchExport::new(results);

    if let Some(path) = &args.export {
        export.write_to_file(path)?;
        info!("Exported {} batch runs to {}", export.runs.len(), path.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&export.summaries)?);
    }
    Ok(true)
}

fn report(result: &ScenarioResult) {
    if result.passed {
        info!("✓ {} (seed={}) PASSED", result.scenario, result.seed);
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario,
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

/// Prints the summary and returns whether every run passed.
fn summarize(args: &Args, results: &[ScenarioResult]) -> Result<bool, SimError> {
    let total = results.len();
    let failed: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed.len(),
            "failed": failed.len(),
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario,
                    "seed": r.seed,
                    "passed": r.passed,
                    "rounds": r.total_rounds,
                    "time": r.final_time,
                    "metrics": r.metrics,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if failed.is_empty() {
        info!("✅ All {} runs passed!", total);
    } else {
        error!("❌ {}/{} runs failed!", failed.len(), total);
        for result in &failed {
            error!(
                "  - {} seed={}: {}",
                result.scenario,
                result.seed,
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
    }

    Ok(failed.is_empty())
}
