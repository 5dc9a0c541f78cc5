use geo::{Coord, Point};
use serde::{Deserialize, Serialize};

/// One raw position sample as delivered by the position source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Latitude in degrees (-90..90)
    pub lat: f64,
    /// Longitude in degrees (-180..180)
    pub lon: f64,
    /// Speed reported by the sensor in m/s, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_hint: Option<f64>,
    /// Horizontal accuracy radius in meters; lower is better
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Milliseconds since the Unix epoch, non-decreasing within a stream
    pub timestamp_ms: i64,
}

impl Fix {
    pub fn new(lat: f64, lon: f64, timestamp_ms: i64) -> Self {
        Self {
            lat,
            lon,
            speed_hint: None,
            accuracy: None,
            timestamp_ms,
        }
    }

    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy = Some(meters);
        self
    }

    pub fn with_speed_hint(mut self, mps: f64) -> Self {
        self.speed_hint = Some(mps);
        self
    }

    /// Position as a geo point (x = longitude, y = latitude).
    pub fn point(&self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

/// Position after per-axis smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedFix {
    pub lat: f64,
    pub lon: f64,
}

/// Coordinate in the map provider's shifted frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayCoordinate {
    pub lon: f64,
    pub lat: f64,
}

impl From<DisplayCoordinate> for Coord {
    fn from(c: DisplayCoordinate) -> Self {
        Coord { x: c.lon, y: c.lat }
    }
}

/// Raw position readout shown next to the metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionReadout {
    pub lat: f64,
    pub lon: f64,
    pub speed_hint: Option<f64>,
}

impl From<&Fix> for PositionReadout {
    fn from(fix: &Fix) -> Self {
        Self {
            lat: fix.lat,
            lon: fix.lon,
            speed_hint: fix.speed_hint,
        }
    }
}

/// Derived motion metrics after an ingest call.
///
/// Speed and acceleration are magnitudes. Duration and average speed are
/// `None` until a session start time exists.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricsSnapshot {
    /// m/s
    pub speed: f64,
    /// m/s²
    pub acceleration: f64,
    /// meters
    pub total_distance: f64,
    pub duration_minutes: Option<f64>,
    pub avg_speed_kmh: Option<f64>,
    pub goal_reached: bool,
}

impl MetricsSnapshot {
    pub fn total_distance_km(&self) -> f64 {
        self.total_distance / 1000.0
    }
}
