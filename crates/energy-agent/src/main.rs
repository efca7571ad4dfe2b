use anyhow::{Context, Result};
use clap::Parser;
use energy_agent::{AgentConfig, HttpEvaluator, Optimizer, RunArtifacts};
use energy_eval::{Benchmark, EvalError, MakeBenchmark, TargetSpec};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent configuration (TOML)
    #[arg(long, short)]
    config: PathBuf,

    /// Optimization iterations per target (overrides `iterations`)
    #[arg(long)]
    iterations: Option<usize>,

    /// Artifact root (overrides `output_dir`)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Only run the target with this test class or `program/group/class` label
    #[arg(long)]
    target: Option<String>,

    /// Evaluate baselines only; no evaluator requests
    #[arg(long, default_value_t = false)]
    baseline_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = AgentConfig::load(&args.config)?;
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(filter) = &args.target {
        config.retain_targets(filter);
    }
    if config.targets.is_empty() {
        warn!("No targets configured; nothing to do");
        return Ok(());
    }

    let api_key = match &config.llm.api_key_env {
        Some(var) => {
            let key = std::env::var(var).ok();
            if key.is_none() && !args.baseline_only {
                warn!(var = %var, "API key variable not set; sending unauthenticated requests");
            }
            key
        }
        None => None,
    };
    let evaluator = HttpEvaluator::new(config.llm.clone(), api_key)
        .context("Failed to build evaluator client")?;

    info!(
        targets = config.targets.len(),
        iterations = config.iterations,
        evaluator = %config.llm.completions_url(),
        model = %config.llm.model,
        "Energy optimizer starting"
    );

    let mut failed = 0usize;
    for spec in config.targets.clone() {
        let label = spec.label();
        if let Err(e) = run_target(&config, spec, evaluator.clone(), args.baseline_only).await {
            failed += 1;
            error!(benchmark = %label, "Target failed: {e:#}");
        }
    }

    info!(
        total = config.targets.len(),
        failed,
        "Energy optimizer finished"
    );
    if failed > 0 {
        anyhow::bail!("{failed} of {} targets failed", config.targets.len());
    }
    Ok(())
}

async fn run_target(
    config: &AgentConfig,
    spec: TargetSpec,
    evaluator: HttpEvaluator,
    baseline_only: bool,
) -> Result<()> {
    let label = spec.label();
    let artifacts = RunArtifacts::for_target(
        &config.output_dir,
        &spec,
        &config.pipeline.source_extension,
    );

    let bench = match MakeBenchmark::new(spec, config.pipeline.clone()).await {
        Ok(bench) => bench,
        Err(EvalError::Baseline { status, detail }) => {
            warn!(benchmark = %label, status = %status, "Baseline did not pass; skipping target");
            tracing::debug!(benchmark = %label, "Baseline output:\n{detail}");
            return Ok(());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to set up {label}")),
    };

    if baseline_only {
        artifacts.write(bench.history(), &[]).await?;
        return Ok(());
    }

    let mut optimizer = Optimizer::new(bench, evaluator, config.iterations);
    let result = optimizer.run().await;
    let bench = optimizer.into_benchmark();

    // Keep the partial history when the loop aborts.
    let outcomes = match result {
        Ok(outcomes) => outcomes,
        Err(e) => {
            artifacts.write(bench.history(), &[]).await?;
            return Err(e);
        }
    };
    artifacts.write(bench.history(), &outcomes).await?;

    if let Some(comparison) = bench.comparison() {
        info!(
            benchmark = %label,
            best_index = comparison.lowest_avg_energy.index,
            delta_pct = %format!("{:+.2}", comparison.best_energy_delta_pct()),
            "Target finished"
        );
    }
    Ok(())
}
