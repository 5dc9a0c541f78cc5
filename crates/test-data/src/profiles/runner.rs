//! Runner movement profile, parameterised by pace.

use super::AthleteProfile;

/// Steady-state running described by pace rather than speed, since that is
/// how runners quote it. The default of 4:45/km sits comfortably under the
/// tracker's speed ceiling even with variance applied.
#[derive(Debug, Clone)]
pub struct RunnerProfile {
    /// Seconds per kilometer.
    pace_secs_per_km: f64,
    /// Step-to-step spread of speed.
    variance: f64,
}

impl Default for RunnerProfile {
    fn default() -> Self {
        Self {
            pace_secs_per_km: 285.0,
            variance: 0.08,
        }
    }
}

impl RunnerProfile {
    /// `pace_min_per_km` of 5.0 means 5:00/km.
    pub fn with_pace(pace_min_per_km: f64) -> Self {
        Self {
            pace_secs_per_km: pace_min_per_km * 60.0,
            ..Default::default()
        }
    }
}

impl AthleteProfile for RunnerProfile {
    fn base_speed_mps(&self) -> f64 {
        1000.0 / self.pace_secs_per_km
    }

    fn variance(&self) -> f64 {
        self.variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pace_speed() {
        let profile = RunnerProfile::default();
        assert!((profile.base_speed_mps() - 3.509).abs() < 0.001);
    }

    #[test]
    fn test_pace_round_trips() {
        let profile = RunnerProfile::with_pace(4.0);
        assert!((profile.base_speed_mps() - 1000.0 / 240.0).abs() < 1e-12);
    }
}
