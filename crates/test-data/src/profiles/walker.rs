//! Walker movement profile.

use super::AthleteProfile;

/// Movement profile for walking.
///
/// Based on typical pedestrian pace:
/// - Base speed: ~5 km/h (1.4 m/s)
/// - Fairly large step-to-step variance (crossings, crowds)
#[derive(Debug, Clone)]
pub struct WalkerProfile {
    /// Base speed in m/s.
    base_speed: f64,
    /// Speed variance (coefficient of variation).
    variance: f64,
}

impl Default for WalkerProfile {
    fn default() -> Self {
        Self {
            base_speed: 1.4, // ~5 km/h
            variance: 0.12,
        }
    }
}

impl WalkerProfile {
    /// Creates a walker profile with the given speed in km/h.
    pub fn with_speed(speed_kmh: f64) -> Self {
        Self {
            base_speed: speed_kmh / 3.6,
            ..Default::default()
        }
    }

    /// Constant speed in m/s with no variance. Handy for exact expectations.
    pub fn steady(speed_mps: f64) -> Self {
        Self {
            base_speed: speed_mps,
            variance: 0.0,
        }
    }
}

impl AthleteProfile for WalkerProfile {
    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn variance(&self) -> f64 {
        self.variance
    }
}
