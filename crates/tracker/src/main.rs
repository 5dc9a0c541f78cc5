use std::env;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tracker::{config::TrackerConfig, display::MetricsDisplay, run_replay};

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let Some(path) = env::args().nth(1) else {
        anyhow::bail!("usage: replay <fixes.gpx|fixes.jsonl>");
    };

    let config = TrackerConfig::load()?;
    tracing::info!(
        goal_m = config.goal_distance_m,
        warm_up = config.gates.warm_up_samples,
        "Loaded config"
    );

    let summary = run_replay(config, &path).await?;

    tracing::info!("Session {} finished", summary.id);
    tracing::info!("  Accepted fixes: {}", summary.accepted);
    tracing::info!("  Held fixes: {}", summary.rejected);
    tracing::info!("  Path points: {}", summary.path_points);
    tracing::info!("  {}", MetricsDisplay::from(&summary.snapshot));

    Ok(())
}
