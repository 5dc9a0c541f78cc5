//! Text formatting for the metrics panel and position readout.

use std::fmt;

use serde::Serialize;

use crate::models::{MetricsSnapshot, PositionReadout};

/// Shown for fields that have no value yet.
pub const PLACEHOLDER: &str = "-";

/// Display-ready metrics, one string per panel field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsDisplay {
    pub speed: String,
    pub acceleration: String,
    pub distance_km: String,
    pub duration_minutes: String,
    pub avg_speed_kmh: String,
    pub goal_reached: bool,
}

impl MetricsDisplay {
    /// Every field showing the placeholder.
    pub fn empty() -> Self {
        Self {
            speed: PLACEHOLDER.to_string(),
            acceleration: PLACEHOLDER.to_string(),
            distance_km: PLACEHOLDER.to_string(),
            duration_minutes: PLACEHOLDER.to_string(),
            avg_speed_kmh: PLACEHOLDER.to_string(),
            goal_reached: false,
        }
    }
}

impl From<&MetricsSnapshot> for MetricsDisplay {
    fn from(s: &MetricsSnapshot) -> Self {
        Self {
            speed: fixed(s.speed, 2),
            acceleration: fixed(s.acceleration, 2),
            distance_km: fixed(s.total_distance_km(), 2),
            duration_minutes: optional(s.duration_minutes, 1),
            avg_speed_kmh: optional(s.avg_speed_kmh, 1),
            goal_reached: s.goal_reached,
        }
    }
}

impl fmt::Display for MetricsDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "speed {} m/s, accel {} m/s², distance {} km, time {} min, avg {} km/h",
            self.speed, self.acceleration, self.distance_km, self.duration_minutes, self.avg_speed_kmh
        )?;
        if self.goal_reached {
            write!(f, " (goal reached)")?;
        }
        Ok(())
    }
}

/// Display-ready position readout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadoutDisplay {
    pub lat: String,
    pub lon: String,
    pub speed_hint: String,
}

impl From<&PositionReadout> for ReadoutDisplay {
    fn from(r: &PositionReadout) -> Self {
        Self {
            lat: format!("{:.6}", r.lat),
            lon: format!("{:.6}", r.lon),
            speed_hint: optional(r.speed_hint, 2),
        }
    }
}

/// Non-finite values render as zero rather than `NaN`/`inf`.
fn fixed(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    format!("{value:.decimals$}")
}

fn optional(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| fixed(v, decimals))
}
