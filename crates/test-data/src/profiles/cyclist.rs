//! Cyclist movement profile.

use super::AthleteProfile;

/// Urban riding at a fixed cruising speed in km/h. Unlike walking and
/// running, a ride can exceed the pedestrian-scale speed ceiling, which is
/// what makes it useful in tests.
#[derive(Debug, Clone)]
pub struct CyclistProfile {
    cruise_kmh: f64,
    variance: f64,
}

impl Default for CyclistProfile {
    fn default() -> Self {
        Self {
            cruise_kmh: 20.0,
            variance: 0.10,
        }
    }
}

impl CyclistProfile {
    pub fn with_speed(cruise_kmh: f64) -> Self {
        Self {
            cruise_kmh,
            ..Default::default()
        }
    }
}

impl AthleteProfile for CyclistProfile {
    fn base_speed_mps(&self) -> f64 {
        self.cruise_kmh / 3.6
    }

    fn variance(&self) -> f64 {
        self.variance
    }
}
