//! Motion metrics derived from a stream of raw fixes.
//!
//! [`MetricsEstimator::ingest`] is a pure transition: it takes the current
//! [`MetricsState`] by value and returns the next one together with an
//! [`IngestOutcome`]. Sanity gates never fail the call; a rejected sample holds
//! the previous metrics and only advances the last-fix bookkeeping.

use serde::Serialize;

use crate::{
    config::GateConfig,
    distance::haversine_distance,
    models::{Fix, MetricsSnapshot},
};

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Everything the estimator carries between fixes for one session.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricsState {
    last_fix: Option<Fix>,
    last_speed: Option<f64>,
    sample_count: u32,
    total_distance: f64,
    session_start_ms: Option<i64>,
    goal_reached: bool,
    snapshot: MetricsSnapshot,
}

impl MetricsState {
    /// Fresh state for a session that started at `start_ms`.
    pub fn started_at(start_ms: i64) -> Self {
        Self {
            session_start_ms: Some(start_ms),
            ..Self::default()
        }
    }

    /// Records the session start if none has been recorded yet.
    pub fn ensure_started(&mut self, start_ms: i64) {
        self.session_start_ms.get_or_insert(start_ms);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn last_fix(&self) -> Option<&Fix> {
        self.last_fix.as_ref()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_fix.map(|f| f.timestamp_ms)
    }

    pub fn last_speed(&self) -> f64 {
        self.last_speed.unwrap_or(0.0)
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Meters accumulated over accepted steps.
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn session_start_ms(&self) -> Option<i64> {
        self.session_start_ms
    }

    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    /// Metrics as of the last ingest call.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot
    }

    /// Last metrics with duration and average speed recomputed for `now_ms`.
    pub fn snapshot_at(&self, now_ms: i64) -> MetricsSnapshot {
        let (duration_minutes, avg_speed_kmh) = self.timing(now_ms);
        MetricsSnapshot {
            duration_minutes,
            avg_speed_kmh,
            ..self.snapshot
        }
    }

    /// Elapsed minutes and average km/h, or `None` before the session started.
    fn timing(&self, now_ms: i64) -> (Option<f64>, Option<f64>) {
        let Some(start) = self.session_start_ms else {
            return (None, None);
        };
        let minutes = now_ms.saturating_sub(start).max(0) as f64 / MILLIS_PER_MINUTE;
        let avg = if minutes > 0.0 {
            (self.total_distance / 1000.0) / (minutes / 60.0)
        } else {
            0.0
        };
        (Some(minutes), Some(avg))
    }

    /// Adds an accepted step and reports whether the goal was crossed by it.
    fn accumulate(&mut self, meters: f64, goal_m: f64) -> bool {
        self.total_distance += meters;
        if !self.goal_reached && self.total_distance >= goal_m {
            self.goal_reached = true;
            return true;
        }
        false
    }

    fn refresh_distance(&mut self, now_ms: i64) {
        let (duration_minutes, avg_speed_kmh) = self.timing(now_ms);
        self.snapshot.total_distance = self.total_distance;
        self.snapshot.goal_reached = self.goal_reached;
        self.snapshot.duration_minutes = duration_minutes;
        self.snapshot.avg_speed_kmh = avg_speed_kmh;
    }
}

/// Why a sample did not produce new rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Rejection {
    /// Still inside the warm-up window.
    WarmUp { sample: u32 },
    /// No previous fix to measure against.
    NoReference,
    /// Interval to the previous fix is outside the accepted window.
    Interval { secs: f64 },
    /// Step is too long to be real motion.
    Implausible { meters: f64 },
}

/// An accepted step between two consecutive fixes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Step {
    pub meters: f64,
    pub secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Verdict {
    Accepted {
        step: Step,
        /// Derived speed exceeded the ceiling and was replaced.
        speed_clamped: bool,
        /// Derived acceleration exceeded the ceiling and was zeroed.
        acceleration_clamped: bool,
    },
    Rejected(Rejection),
}

/// Result of one ingest call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub snapshot: MetricsSnapshot,
    pub verdict: Verdict,
    /// True only on the call that first reached the goal distance.
    pub goal_just_reached: bool,
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self.verdict, Verdict::Accepted { .. })
    }
}

/// What the gates allow a fix to contribute.
enum Admission {
    /// Inside the warm-up window; the step counts toward distance if present.
    WarmUp(Option<Step>),
    /// Rejected; metrics are held.
    Hold(Rejection),
    Accept(Step),
}

/// Applies the gates and derivations to each fix.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsEstimator {
    gates: GateConfig,
    goal_distance_m: f64,
}

impl MetricsEstimator {
    pub fn new(gates: GateConfig, goal_distance_m: f64) -> Self {
        Self {
            gates,
            goal_distance_m,
        }
    }

    /// Folds one fix into `state`. Fixes must arrive in timestamp order.
    pub fn ingest(
        &self,
        mut state: MetricsState,
        fix: &Fix,
        now_ms: i64,
    ) -> (MetricsState, IngestOutcome) {
        state.sample_count += 1;

        let (verdict, goal_just_reached) = match self.admit(&state, fix) {
            Admission::WarmUp(step) => {
                let goal_just_reached = match step {
                    Some(step) => self.accumulate(&mut state, step, now_ms),
                    None => false,
                };
                let sample = state.sample_count;
                (Verdict::Rejected(Rejection::WarmUp { sample }), goal_just_reached)
            }
            Admission::Hold(rejection) => (Verdict::Rejected(rejection), false),
            Admission::Accept(step) => {
                let goal_just_reached = self.accumulate(&mut state, step, now_ms);
                let (speed, speed_clamped) =
                    self.derive_speed(step, fix.accuracy, state.last_speed);
                let (acceleration, acceleration_clamped) =
                    self.derive_acceleration(speed, state.last_speed, step.secs);

                state.snapshot.speed = speed.abs();
                state.snapshot.acceleration = acceleration.abs();
                state.last_speed = Some(speed);

                let verdict = Verdict::Accepted {
                    step,
                    speed_clamped,
                    acceleration_clamped,
                };
                (verdict, goal_just_reached)
            }
        };

        state.last_fix = Some(*fix);
        let outcome = IngestOutcome {
            snapshot: state.snapshot,
            verdict,
            goal_just_reached,
        };
        (state, outcome)
    }

    /// Decides what a fix may contribute before anything is mutated.
    fn admit(&self, state: &MetricsState, fix: &Fix) -> Admission {
        let step = self.check_step(state.last_fix.as_ref(), fix);
        if state.sample_count < self.gates.warm_up_samples {
            let counted = step.ok().filter(|_| self.gates.accumulate_during_warm_up);
            return Admission::WarmUp(counted);
        }
        match step {
            Ok(step) => Admission::Accept(step),
            Err(rejection) => Admission::Hold(rejection),
        }
    }

    /// Adds the step to the running total and refreshes the distance-derived
    /// metrics. Returns true when this step crossed the goal.
    fn accumulate(&self, state: &mut MetricsState, step: Step, now_ms: i64) -> bool {
        let crossed = state.accumulate(step.meters, self.goal_distance_m);
        state.refresh_distance(now_ms);
        crossed
    }

    /// Interval and distance gates against the previous fix.
    fn check_step(&self, last: Option<&Fix>, fix: &Fix) -> Result<Step, Rejection> {
        let last = last.ok_or(Rejection::NoReference)?;
        let secs = self.interval_gate(last, fix)?;
        let meters = self.distance_gate(last, fix)?;
        Ok(Step { meters, secs })
    }

    fn interval_gate(&self, last: &Fix, fix: &Fix) -> Result<f64, Rejection> {
        let secs = fix.timestamp_ms.saturating_sub(last.timestamp_ms) as f64 / 1000.0;
        if secs > self.gates.min_interval_secs && secs < self.gates.max_interval_secs {
            Ok(secs)
        } else {
            Err(Rejection::Interval { secs })
        }
    }

    /// Uses the raw coordinates, never the smoothed ones.
    fn distance_gate(&self, last: &Fix, fix: &Fix) -> Result<f64, Rejection> {
        let meters = haversine_distance(last.lat, last.lon, fix.lat, fix.lon);
        if meters <= self.gates.max_step_distance_m {
            Ok(meters)
        } else {
            Err(Rejection::Implausible { meters })
        }
    }

    /// Confidence in a raw rate given the reported accuracy radius.
    /// Missing accuracy gets no trust at all.
    fn accuracy_weight(&self, accuracy: Option<f64>) -> f64 {
        match accuracy {
            Some(acc) if acc.is_finite() => {
                (1.0 - acc / self.gates.accuracy_trust_radius_m).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    fn derive_speed(&self, step: Step, accuracy: Option<f64>, last: Option<f64>) -> (f64, bool) {
        let last = last.unwrap_or(0.0);
        let raw = step.meters / step.secs;
        let weight = self.accuracy_weight(accuracy);
        let speed = raw * weight + last * (1.0 - weight);

        if speed > self.gates.max_speed_mps {
            (last, true)
        } else {
            (speed, false)
        }
    }

    fn derive_acceleration(&self, speed: f64, last: Option<f64>, secs: f64) -> (f64, bool) {
        let Some(last) = last else {
            return (0.0, false);
        };
        let acceleration = (speed - last) / secs;
        if acceleration.abs() > self.gates.max_acceleration_mps2 {
            (0.0, true)
        } else {
            (acceleration, false)
        }
    }
}
