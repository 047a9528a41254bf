use std::path::PathBuf;

use clap::Parser;

use craft_bench::config::{BenchmarkConfig, ResolvedOutputs};
use craft_bench::logging::init_logging;
use craft_bench::runner::PlayoutRunner;

/// Playout harness for the crafting solver.
#[derive(Debug, Parser)]
#[command(
    name = "craft-bench",
    author,
    version,
    about = "Seeded playouts that drive the solver turn by turn"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/craft.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of playouts per scenario.
    #[arg(long, value_name = "RUNS")]
    runs: Option<usize>,

    /// Override the RNG seed for condition and success rolls.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the per-decision node budget.
    #[arg(long, value_name = "NODES")]
    nodes: Option<u64>,

    /// Exit after validating the configuration (no playouts are run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(runs) = cli.runs {
        config.playouts.runs = runs;
    }

    if let Some(seed) = cli.seed {
        config.playouts.seed = Some(seed);
    }

    if let Some(nodes) = cli.nodes {
        config.search.nodes = nodes;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let scenario_count = config.scenarios.len();
    let run_id = config.run_id.clone();
    let runs = config.playouts.runs;

    println!(
        "Loaded configuration '{run_id}' with {scenario_count} scenario{} ({runs} playouts each)",
        if scenario_count == 1 { "" } else { "s" }
    );

    let logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = PlayoutRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: playouts skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Run complete for '{run_id}': {}/{} playouts finished, {} rows at {}",
        summary.finished,
        summary.playouts,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    for scenario in &summary.scenarios {
        println!(
            "  {}: {:.1}% success ({} failed, {} stuck, {} hit the turn limit)",
            scenario.name,
            scenario.success_rate() * 100.0,
            scenario.failed,
            scenario.stuck,
            scenario.turn_limit
        );
    }
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(guard) = logging_guard.as_ref() {
        println!("Telemetry log: {}", guard.telemetry_path.display());
    }

    Ok(())
}
