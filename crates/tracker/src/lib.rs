pub mod config;
pub mod datum;
pub mod display;
pub mod distance;
pub mod errors;
pub mod file_parsers;
pub mod metrics;
pub mod models;
pub mod session;
pub mod smoothing;
pub mod source;

use std::path::Path;

use geo::LineString;
use tokio::sync::oneshot;
use tracing::info;

use crate::{
    config::{TimeBase, TrackerConfig},
    display::{MetricsDisplay, ReadoutDisplay},
    errors::AcquisitionError,
    models::DisplayCoordinate,
    session::{SessionController, SessionSummary, TrackerSink},
    source::ReplaySource,
};

/// Sink that writes everything to the log instead of a map widget.
#[derive(Debug, Default)]
pub struct LogSink {
    pub positions: usize,
}

impl TrackerSink for LogSink {
    fn show_position(&mut self, readout: &ReadoutDisplay, coordinate: DisplayCoordinate) {
        self.positions += 1;
        tracing::debug!(
            lat = %readout.lat,
            lon = %readout.lon,
            display_lon = coordinate.lon,
            display_lat = coordinate.lat,
            "Position"
        );
    }

    fn show_metrics(&mut self, metrics: &MetricsDisplay) {
        info!("{metrics}");
    }

    fn show_map(&mut self, center: DisplayCoordinate, zoom: u8) {
        tracing::debug!(lon = center.lon, lat = center.lat, zoom, "Map initialised");
    }

    fn extend_path(&mut self, _coordinate: DisplayCoordinate, path: &LineString) {
        tracing::trace!(points = path.0.len(), "Path extended");
    }

    fn goal_reached(&mut self, total_distance_m: f64) {
        info!("Goal reached after {:.0} m", total_distance_m);
    }

    fn acquisition_failed(&mut self, error: AcquisitionError) {
        tracing::error!("Position acquisition failed: {error}");
    }

    fn session_stopped(&mut self) {
        info!("Session stopped");
    }
}

/// Replays a recorded fix log through a full session, using fix timestamps as
/// the clock.
pub async fn run_replay(
    mut config: TrackerConfig,
    path: impl AsRef<Path>,
) -> anyhow::Result<SessionSummary> {
    let path = path.as_ref();
    let fixes = file_parsers::read_fix_log(path)?;
    info!("Replaying {} fixes from {}", fixes.len(), path.display());

    config.time_base = TimeBase::FixTimestamps;
    let mut controller = SessionController::new(config);
    let source = ReplaySource::new(fixes);
    let mut sink = LogSink::default();
    controller.init_view(&mut sink);
    let (_shutdown_tx, shutdown_rx) = oneshot::channel();

    let summary = controller.run(&source, &mut sink, shutdown_rx).await?;
    Ok(summary)
}
