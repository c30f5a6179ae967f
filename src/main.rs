use anyhow::{Context, Result};
use cellfield_lib::model::config::AppConfig;
use cellfield_lib::model::metrics::init_logging;
use cellfield_lib::model::world::World;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the configured end time, in minutes
    #[arg(long)]
    max_time: Option<f64>,

    /// Writes a JSON snapshot of the final state to this path
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging("cellfield=info,cellfield_lib=info,cellfield_core=info");

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.run.seed = Some(seed);
    }
    if let Some(max_time) = args.max_time {
        config.time.max_time = max_time;
    }

    if config.run.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.run.threads)
            .build_global()
            .context("Failed to configure worker pool")?;
    }

    let max_time = config.time.max_time;
    let mut world = World::new(config)?;
    let steps = world.run_until(max_time)?;

    tracing::info!(
        steps,
        time = world.time,
        agents = world.agent_count(),
        births = world.metrics.births(),
        removals = world.metrics.removals(),
        elapsed_ms = world.metrics.elapsed().as_millis() as u64,
        "Run finished"
    );

    if let Some(path) = &args.snapshot {
        let json = serde_json::to_string_pretty(&world.snapshot())?;
        std::fs::write(path, json)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), "Wrote snapshot");
    }
    Ok(())
}
