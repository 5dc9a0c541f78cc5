//! Writes a synthetic fix log for manual replays.
//!
//! Run with:
//! ```
//! cargo run -p test-data --bin generate -- walk.gpx
//! ```
//!
//! Knobs come from the environment:
//! - `GEN_PROFILE`: walk, run, ride (default walk)
//! - `GEN_DISTANCE_M`: path length in meters (default 2500)
//! - `GEN_REGION`: beijing, shanghai, boulder (default beijing)
//! - `GEN_SEED`: RNG seed (default 12345)
//! - `GEN_GLITCHES`: set to add jumps, duplicates, gaps and missing accuracy

use anyhow::{Context, bail};
use test_data::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: generate <out.gpx|out.jsonl>");
    };

    let profile = std::env::var("GEN_PROFILE").unwrap_or_else(|_| "walk".to_string());
    let distance: f64 = env_or("GEN_DISTANCE_M", 2500.0);
    let seed: u64 = env_or("GEN_SEED", 12345); // Reproducible data

    let region = match std::env::var("GEN_REGION").as_deref() {
        Ok("shanghai") => Region::SHANGHAI,
        Ok("boulder") => Region::BOULDER,
        Ok("beijing") | Err(_) => Region::BEIJING,
        Ok(other) => bail!("unknown region {other:?}, expected beijing, shanghai or boulder"),
    };
    let generator = FixStreamGenerator::for_region(region);

    let builder = match profile.as_str() {
        "walk" => ScenarioBuilder::new().with_profile(WalkerProfile::default()),
        "run" => ScenarioBuilder::new().with_profile(RunnerProfile::default()),
        "ride" => ScenarioBuilder::new().with_profile(CyclistProfile::default()),
        other => bail!("unknown profile {other:?}, expected walk, run or ride"),
    };
    let builder = builder
        .with_generator(generator)
        .with_distance(distance)
        .with_seed(seed);
    let builder = if std::env::var_os("GEN_GLITCHES").is_some() {
        builder
            .with_jumps(3, 120.0)
            .with_duplicates(2)
            .with_gaps(2, 20.0)
            .with_missing_accuracy(3)
    } else {
        builder
    };

    let scenario = builder.build();
    write_fix_log(&path, &scenario.fixes).with_context(|| format!("writing {path}"))?;

    info!("Wrote {} fixes to {}", scenario.fixes.len(), path);
    info!("  Path distance: {:.1} m", scenario.clean.path_distance_m);
    info!("  Expected tracked distance: {:.1} m", scenario.expected_distance_m);
    info!("  Glitches: {}", scenario.glitches.len());

    Ok(())
}
