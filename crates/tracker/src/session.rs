//! Session lifecycle: start, stop, refresh, and the loop that pumps fixes from
//! a [`PositionSource`] through smoothing, the datum shift and the metrics
//! estimator into a [`TrackerSink`].
//!
//! Everything runs on one task. A fix is processed to completion before the
//! next one is read, so the session state needs no locking.

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use geo::{Coord, LineString};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::oneshot;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::{
    config::{TimeBase, TrackerConfig},
    datum,
    display::{MetricsDisplay, ReadoutDisplay},
    errors::{AcquisitionError, TrackerError},
    metrics::{IngestOutcome, MetricsEstimator, MetricsState, Verdict},
    models::{DisplayCoordinate, Fix, MetricsSnapshot, PositionReadout},
    smoothing::PositionSmoother,
    source::PositionSource,
};

/// Source of wall-clock time in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self(Arc::new(AtomicI64::new(now_ms)))
    }

    pub fn set(&self, now_ms: i64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives everything a session wants rendered or announced.
pub trait TrackerSink: Send {
    /// Moves the marker (and map center) to `coordinate`.
    fn show_position(&mut self, readout: &ReadoutDisplay, coordinate: DisplayCoordinate);

    fn show_metrics(&mut self, metrics: &MetricsDisplay);

    /// Sets up the map view before any fix arrives.
    fn show_map(&mut self, _center: DisplayCoordinate, _zoom: u8) {}

    /// Called after `coordinate` was appended to the session path.
    fn extend_path(&mut self, _coordinate: DisplayCoordinate, _path: &LineString) {}

    /// Fired once per session when the goal distance is first reached.
    fn goal_reached(&mut self, _total_distance_m: f64) {}

    fn acquisition_failed(&mut self, _error: AcquisitionError) {}

    fn session_stopped(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    Idle,
    Active,
    Stopped,
    Failed(AcquisitionError),
}

/// State owned by one session. Replaced wholesale on every start.
#[derive(Debug)]
struct Session {
    id: Uuid,
    span: tracing::Span,
    metrics: MetricsState,
    smoother: PositionSmoother,
    path: LineString,
    accepted: usize,
    rejected: usize,
}

impl Session {
    fn reset(&mut self) {
        self.metrics.reset();
        self.smoother.reset();
        self.path.0.clear();
        self.accepted = 0;
        self.rejected = 0;
    }
}

/// Summary returned when a driven session ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub status: SessionStatus,
    pub snapshot: MetricsSnapshot,
    pub path_points: usize,
    pub accepted: usize,
    pub rejected: usize,
}

pub struct SessionController<K: Clock = SystemClock> {
    config: TrackerConfig,
    estimator: MetricsEstimator,
    clock: K,
    status: SessionStatus,
    session: Option<Session>,
}

impl SessionController<SystemClock> {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K: Clock> SessionController<K> {
    pub fn with_clock(config: TrackerConfig, clock: K) -> Self {
        let estimator = MetricsEstimator::new(config.gates.clone(), config.goal_distance_m);
        Self {
            config,
            estimator,
            clock,
            status: SessionStatus::Idle,
            session: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Path drawn so far in the current (or last) session.
    pub fn path(&self) -> Option<&LineString> {
        self.session.as_ref().map(|s| &s.path)
    }

    pub fn metrics_state(&self) -> Option<&MetricsState> {
        self.session.as_ref().map(|s| &s.metrics)
    }

    /// Centers the map on the configured default and blanks the metrics panel.
    pub fn init_view(&self, sink: &mut impl TrackerSink) {
        let (lon, lat) = self.config.map.center;
        sink.show_map(DisplayCoordinate { lon, lat }, self.config.map.zoom);
        sink.show_metrics(&MetricsDisplay::empty());
    }

    /// Begins a new session, discarding all distance and filter history.
    pub fn start(&mut self) -> Result<Uuid, TrackerError> {
        if self.is_active() {
            return Err(TrackerError::SessionActive);
        }

        let id = Uuid::new_v4();
        let metrics = match self.config.time_base {
            TimeBase::WallClock => MetricsState::started_at(self.clock.now_ms()),
            TimeBase::FixTimestamps => MetricsState::default(),
        };

        match self.session.as_mut() {
            Some(session) => {
                session.reset();
                session.id = id;
                session.span = info_span!("session", %id);
                session.metrics = metrics;
            }
            None => {
                self.session = Some(Session {
                    id,
                    span: info_span!("session", %id),
                    metrics,
                    smoother: PositionSmoother::new(&self.config.filter),
                    path: LineString::new(Vec::new()),
                    accepted: 0,
                    rejected: 0,
                });
            }
        }

        self.status = SessionStatus::Active;
        info!(session = %id, "Session started");
        Ok(id)
    }

    /// Ends the session. The last metrics and path stay available.
    pub fn stop(&mut self, sink: &mut impl TrackerSink) {
        if !self.is_active() {
            return;
        }
        self.status = SessionStatus::Stopped;
        if let Some(session) = &self.session {
            let _enter = session.span.enter();
            info!(
                accepted = session.accepted,
                rejected = session.rejected,
                distance_m = session.metrics.total_distance(),
                "Session stopped"
            );
        }
        sink.session_stopped();
    }

    /// Runs one fix through the pipeline and pushes the results to `sink`.
    pub fn handle_fix(
        &mut self,
        fix: &Fix,
        sink: &mut impl TrackerSink,
    ) -> Result<IngestOutcome, TrackerError> {
        if !self.is_active() {
            return Err(TrackerError::SessionInactive);
        }
        let now_ms = match self.config.time_base {
            TimeBase::WallClock => self.clock.now_ms(),
            TimeBase::FixTimestamps => fix.timestamp_ms,
        };
        let smooth_display = self.config.map.smooth_display;
        let session = self.session.as_mut().ok_or(TrackerError::SessionInactive)?;
        let _enter = session.span.enter();

        let smoothed = session.smoother.update(fix.lat, fix.lon);
        let coordinate = if smooth_display {
            datum::to_display(smoothed.lon, smoothed.lat)
        } else {
            datum::to_display(fix.lon, fix.lat)
        };
        let readout = ReadoutDisplay::from(&PositionReadout::from(fix));
        sink.show_position(&readout, coordinate);
        session.path.0.push(Coord::from(coordinate));
        sink.extend_path(coordinate, &session.path);

        if self.config.time_base == TimeBase::FixTimestamps {
            session.metrics.ensure_started(fix.timestamp_ms);
        }
        let state = std::mem::take(&mut session.metrics);
        let (state, outcome) = self.estimator.ingest(state, fix, now_ms);
        session.metrics = state;

        match outcome.verdict {
            Verdict::Accepted { step, speed_clamped, acceleration_clamped } => {
                session.accepted += 1;
                if speed_clamped || acceleration_clamped {
                    debug!(
                        speed_clamped,
                        acceleration_clamped,
                        meters = step.meters,
                        secs = step.secs,
                        "Clamped derived rate"
                    );
                }
            }
            Verdict::Rejected(rejection) => {
                session.rejected += 1;
                debug!(?rejection, timestamp_ms = fix.timestamp_ms, "Held metrics");
            }
        }

        if outcome.goal_just_reached {
            info!(distance_m = outcome.snapshot.total_distance, "Goal reached");
            sink.goal_reached(outcome.snapshot.total_distance);
        }
        sink.show_metrics(&MetricsDisplay::from(&outcome.snapshot));

        Ok(outcome)
    }

    /// Terminates the active session after an upstream failure. Errors that
    /// arrive with no active session are only logged.
    pub fn handle_error(&mut self, error: AcquisitionError, sink: &mut impl TrackerSink) {
        if !self.is_active() {
            debug!(%error, "Acquisition error with no active session");
            return;
        }
        if let Some(session) = &self.session {
            let _enter = session.span.enter();
            warn!(%error, "Position acquisition failed");
        }
        self.status = SessionStatus::Failed(error);
        sink.acquisition_failed(error);
        sink.session_stopped();
    }

    /// Current metrics with duration and average speed brought up to date.
    /// `None` before any session has started.
    pub fn snapshot(&self) -> Option<MetricsSnapshot> {
        let session = self.session.as_ref()?;
        let now_ms = match self.config.time_base {
            TimeBase::WallClock => self.clock.now_ms(),
            TimeBase::FixTimestamps => session.metrics.last_timestamp()?,
        };
        Some(session.metrics.snapshot_at(now_ms))
    }

    /// One-shot position fetch that only moves the marker.
    pub async fn refresh<S: PositionSource + ?Sized>(
        &self,
        source: &S,
        sink: &mut impl TrackerSink,
    ) -> Result<DisplayCoordinate, TrackerError> {
        let fix = match source.current_fix(&self.config.watch).await {
            Ok(fix) => fix,
            Err(error) => {
                warn!(%error, "Position refresh failed");
                sink.acquisition_failed(error);
                return Err(error.into());
            }
        };
        let coordinate = datum::to_display(fix.lon, fix.lat);
        sink.show_position(&ReadoutDisplay::from(&PositionReadout::from(&fix)), coordinate);
        Ok(coordinate)
    }

    /// Starts a session and drives it until the source closes, fails, or
    /// `shutdown` fires. Fixes already queued when shutdown fires are still
    /// processed before the session stops.
    pub async fn run<S: PositionSource + ?Sized>(
        &mut self,
        source: &S,
        sink: &mut impl TrackerSink,
        mut shutdown: oneshot::Receiver<()>,
    ) -> Result<SessionSummary, TrackerError> {
        self.start()?;

        let mut subscription = match source.watch(&self.config.watch).await {
            Ok(subscription) => subscription,
            Err(error) => {
                self.handle_error(error, sink);
                return Err(error.into());
            }
        };

        let mut shutdown_open = true;
        loop {
            tokio::select! {
                biased;
                signal = &mut shutdown, if shutdown_open => {
                    shutdown_open = false;
                    if signal.is_ok() {
                        debug!("Shutdown requested, draining queued fixes");
                        subscription.close();
                    }
                }
                event = subscription.next() => match event {
                    Some(Ok(fix)) => {
                        self.handle_fix(&fix, sink)?;
                    }
                    Some(Err(error)) => {
                        self.handle_error(error, sink);
                        return Err(error.into());
                    }
                    None => break,
                },
            }
        }

        self.stop(sink);
        self.summary().ok_or(TrackerError::SessionInactive)
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        let session = self.session.as_ref()?;
        Some(SessionSummary {
            id: session.id,
            status: self.status,
            snapshot: self.snapshot()?,
            path_points: session.path.0.len(),
            accepted: session.accepted,
            rejected: session.rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{distance::EARTH_RADIUS_M, source::ReplaySource};

    #[derive(Default)]
    struct RecordingSink {
        positions: Vec<DisplayCoordinate>,
        metrics: Vec<MetricsDisplay>,
        goals: usize,
        failures: Vec<AcquisitionError>,
        stopped: usize,
        maps: Vec<(DisplayCoordinate, u8)>,
    }

    impl TrackerSink for RecordingSink {
        fn show_position(&mut self, _readout: &ReadoutDisplay, coordinate: DisplayCoordinate) {
            self.positions.push(coordinate);
        }

        fn show_metrics(&mut self, metrics: &MetricsDisplay) {
            self.metrics.push(metrics.clone());
        }

        fn show_map(&mut self, center: DisplayCoordinate, zoom: u8) {
            self.maps.push((center, zoom));
        }

        fn goal_reached(&mut self, _total_distance_m: f64) {
            self.goals += 1;
        }

        fn acquisition_failed(&mut self, error: AcquisitionError) {
            self.failures.push(error);
        }

        fn session_stopped(&mut self) {
            self.stopped += 1;
        }
    }

    fn walk(steps: usize, meters: f64, interval_ms: i64) -> Vec<Fix> {
        let deg_per_m = 180.0 / (EARTH_RADIUS_M * std::f64::consts::PI);
        (0..steps)
            .map(|i| {
                Fix::new(39.9 + i as f64 * meters * deg_per_m, 116.4, i as i64 * interval_ms)
                    .with_accuracy(5.0)
            })
            .collect()
    }

    fn controller(clock: ManualClock) -> SessionController<ManualClock> {
        SessionController::with_clock(TrackerConfig::default(), clock)
    }

    #[test]
    fn test_init_view_shows_defaults() {
        let ctl = controller(ManualClock::new(0));
        let mut sink = RecordingSink::default();
        ctl.init_view(&mut sink);

        assert_eq!(
            sink.maps,
            vec![(DisplayCoordinate { lon: 116.397428, lat: 39.90923 }, 15)]
        );
        assert_eq!(sink.metrics, vec![MetricsDisplay::empty()]);
    }

    #[test]
    fn test_handle_fix_requires_active_session() {
        let mut ctl = controller(ManualClock::new(0));
        let mut sink = RecordingSink::default();
        let err = ctl.handle_fix(&Fix::new(39.9, 116.4, 0), &mut sink);
        assert!(matches!(err, Err(TrackerError::SessionInactive)));
        assert!(ctl.snapshot().is_none());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut ctl = controller(ManualClock::new(0));
        ctl.start().unwrap();
        assert!(matches!(ctl.start(), Err(TrackerError::SessionActive)));
    }

    #[test]
    fn test_restart_resets_distance_and_path() {
        let clock = ManualClock::new(0);
        let mut ctl = controller(clock.clone());
        let mut sink = RecordingSink::default();

        ctl.start().unwrap();
        for fix in walk(8, 3.0, 2000) {
            clock.set(fix.timestamp_ms);
            ctl.handle_fix(&fix, &mut sink).unwrap();
        }
        assert!(ctl.metrics_state().unwrap().total_distance() > 0.0);
        ctl.stop(&mut sink);

        // Last metrics stay visible after stop
        assert!(ctl.snapshot().unwrap().total_distance > 0.0);

        let first_id = ctl.session_id();
        ctl.start().unwrap();
        assert_ne!(ctl.session_id(), first_id);
        assert_eq!(ctl.metrics_state().unwrap().total_distance(), 0.0);
        assert_eq!(ctl.metrics_state().unwrap().sample_count(), 0);
        assert!(ctl.path().unwrap().0.is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut ctl = controller(ManualClock::new(0));
        let mut sink = RecordingSink::default();
        ctl.start().unwrap();
        ctl.stop(&mut sink);
        ctl.stop(&mut sink);
        assert_eq!(sink.stopped, 1);
        assert_eq!(ctl.status(), SessionStatus::Stopped);
    }

    #[test]
    fn test_display_coordinates_are_shifted() {
        let mut ctl = controller(ManualClock::new(0));
        let mut sink = RecordingSink::default();
        ctl.start().unwrap();
        ctl.handle_fix(&Fix::new(39.9, 116.4, 0), &mut sink).unwrap();

        let shown = sink.positions[0];
        let (lon, lat) = datum::transform(116.4, 39.9);
        assert_eq!((shown.lon, shown.lat), (lon, lat));
        assert_eq!(ctl.path().unwrap().0.len(), 1);
    }

    #[test]
    fn test_duration_uses_wall_clock() {
        let clock = ManualClock::new(1_000_000);
        let mut ctl = controller(clock.clone());
        ctl.start().unwrap();

        clock.advance(90_000);
        let snapshot = ctl.snapshot().unwrap();
        assert_eq!(snapshot.duration_minutes, Some(1.5));
        assert_eq!(snapshot.avg_speed_kmh, Some(0.0));
    }

    #[test]
    fn test_goal_fires_once_through_sink() {
        let clock = ManualClock::new(0);
        let config = TrackerConfig {
            goal_distance_m: 40.0,
            ..TrackerConfig::default()
        };
        let mut ctl = SessionController::with_clock(config, clock.clone());
        let mut sink = RecordingSink::default();

        ctl.start().unwrap();
        for fix in walk(30, 4.0, 2000) {
            clock.set(fix.timestamp_ms);
            ctl.handle_fix(&fix, &mut sink).unwrap();
        }
        assert_eq!(sink.goals, 1);
        assert!(sink.metrics.last().unwrap().goal_reached);
    }

    #[test]
    fn test_error_terminates_session() {
        let mut ctl = controller(ManualClock::new(0));
        let mut sink = RecordingSink::default();
        ctl.start().unwrap();
        ctl.handle_error(AcquisitionError::PermissionDenied, &mut sink);

        assert_eq!(
            ctl.status(),
            SessionStatus::Failed(AcquisitionError::PermissionDenied)
        );
        assert_eq!(sink.failures, vec![AcquisitionError::PermissionDenied]);
        assert_eq!(sink.stopped, 1);
        assert!(matches!(
            ctl.handle_fix(&Fix::new(0.0, 0.0, 0), &mut sink),
            Err(TrackerError::SessionInactive)
        ));
    }

    #[test]
    fn test_error_after_stop_keeps_status() {
        let mut ctl = controller(ManualClock::new(0));
        let mut sink = RecordingSink::default();
        ctl.start().unwrap();
        ctl.stop(&mut sink);
        ctl.handle_error(AcquisitionError::Timeout, &mut sink);

        assert_eq!(ctl.status(), SessionStatus::Stopped);
        assert!(sink.failures.is_empty());
        assert_eq!(sink.stopped, 1);

        let mut idle = controller(ManualClock::new(0));
        idle.handle_error(AcquisitionError::Timeout, &mut sink);
        assert_eq!(idle.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_run_replays_until_source_closes() {
        let config = TrackerConfig {
            time_base: TimeBase::FixTimestamps,
            ..TrackerConfig::default()
        };
        let mut ctl = SessionController::with_clock(config, ManualClock::new(0));
        let mut sink = RecordingSink::default();
        let source = ReplaySource::new(walk(10, 3.0, 2000));
        let (_tx, rx) = oneshot::channel();

        let summary = ctl.run(&source, &mut sink, rx).await.unwrap();

        assert_eq!(summary.status, SessionStatus::Stopped);
        assert_eq!(summary.path_points, 10);
        assert_eq!(summary.accepted, 6);
        assert_eq!(summary.rejected, 4);
        assert!((summary.snapshot.total_distance - 27.0).abs() < 1e-6);
        assert_eq!(summary.snapshot.duration_minutes, Some(18_000.0 / 60_000.0));
        assert_eq!(sink.metrics.len(), 10);
    }

    #[tokio::test]
    async fn test_run_stops_on_acquisition_error() {
        let mut ctl = controller(ManualClock::new(0));
        let mut sink = RecordingSink::default();
        let source = ReplaySource::new(walk(3, 3.0, 2000)).failing_with(AcquisitionError::Timeout);
        let (_tx, rx) = oneshot::channel();

        let result = ctl.run(&source, &mut sink, rx).await;

        assert!(matches!(
            result,
            Err(TrackerError::Acquisition(AcquisitionError::Timeout))
        ));
        assert_eq!(sink.positions.len(), 3);
        assert_eq!(ctl.status(), SessionStatus::Failed(AcquisitionError::Timeout));
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_fixes() {
        let mut ctl = controller(ManualClock::new(0));
        let mut sink = RecordingSink::default();
        let source = ReplaySource::new(walk(5, 3.0, 2000));
        let (tx, rx) = oneshot::channel();
        tx.send(()).unwrap();

        let summary = ctl.run(&source, &mut sink, rx).await.unwrap();

        assert_eq!(summary.path_points, 5);
        assert_eq!(summary.status, SessionStatus::Stopped);
    }

    #[tokio::test]
    async fn test_refresh_only_moves_marker() {
        let ctl = controller(ManualClock::new(0));
        let mut sink = RecordingSink::default();
        let source = ReplaySource::new(vec![Fix::new(-33.86, 151.2, 0)]);

        let coordinate = ctl.refresh(&source, &mut sink).await.unwrap();

        assert_eq!((coordinate.lon, coordinate.lat), (151.2, -33.86));
        assert_eq!(sink.positions.len(), 1);
        assert!(sink.metrics.is_empty());
        assert!(ctl.metrics_state().is_none());
    }
}
