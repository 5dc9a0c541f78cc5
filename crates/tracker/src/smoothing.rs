//! One-dimensional recursive smoothing for noisy scalar measurements.
//!
//! Each axis gets its own [`ScalarFilter`]; latitude and longitude are never
//! filtered jointly. Noise terms are constants and are not scaled by the time
//! between samples, so responsiveness does not depend on the sample rate.

use serde::Serialize;

use crate::{config::FilterConfig, models::SmoothedFix};

/// Scalar estimator blending each new measurement with the running estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarFilter {
    process_noise: f64,
    measurement_noise: f64,
    initial_covariance: f64,
    covariance: f64,
    /// `None` until the first observation arrives
    estimate: Option<f64>,
}

impl ScalarFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            process_noise: config.process_noise,
            measurement_noise: config.measurement_noise,
            initial_covariance: config.initial_covariance,
            covariance: config.initial_covariance,
            estimate: None,
        }
    }

    /// Folds in a measurement and returns the new estimate.
    ///
    /// The first measurement is adopted as-is.
    pub fn update(&mut self, measurement: f64) -> f64 {
        let Some(estimate) = self.estimate else {
            self.estimate = Some(measurement);
            return measurement;
        };

        let predicted = self.covariance + self.process_noise;
        let gain = predicted / (predicted + self.measurement_noise);
        let estimate = estimate + gain * (measurement - estimate);

        self.covariance = (1.0 - gain) * predicted;
        self.estimate = Some(estimate);
        estimate
    }

    pub fn estimate(&self) -> Option<f64> {
        self.estimate
    }

    pub fn covariance(&self) -> f64 {
        self.covariance
    }

    pub fn reset(&mut self) {
        self.covariance = self.initial_covariance;
        self.estimate = None;
    }
}

/// Independent latitude and longitude filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSmoother {
    lat: ScalarFilter,
    lon: ScalarFilter,
}

impl PositionSmoother {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            lat: ScalarFilter::new(config),
            lon: ScalarFilter::new(config),
        }
    }

    pub fn update(&mut self, lat: f64, lon: f64) -> SmoothedFix {
        SmoothedFix {
            lat: self.lat.update(lat),
            lon: self.lon.update(lon),
        }
    }

    pub fn reset(&mut self) {
        self.lat.reset();
        self.lon.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ScalarFilter {
        ScalarFilter::new(&FilterConfig {
            process_noise: 0.01,
            measurement_noise: 0.1,
            initial_covariance: 1.0,
        })
    }

    #[test]
    fn test_first_update_returns_measurement() {
        let mut f = filter();
        assert_eq!(f.estimate(), None);
        assert_eq!(f.update(42.125), 42.125);
        assert_eq!(f.estimate(), Some(42.125));
    }

    #[test]
    fn test_zero_is_a_real_first_measurement() {
        let mut f = filter();
        assert_eq!(f.update(0.0), 0.0);
        // With zero adopted as the estimate, the next update moves toward 10
        let next = f.update(10.0);
        assert!(next > 0.0 && next < 10.0);
    }

    #[test]
    fn test_converges_on_repeated_measurement() {
        let mut f = filter();
        f.update(0.0);
        let mut est = 0.0;
        for _ in 0..200 {
            est = f.update(5.0);
        }
        assert!((est - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_never_overshoots() {
        let mut f = filter();
        let mut prev = f.update(1.0);
        for m in [3.0, -2.0, 10.0, 10.0, 4.0, -7.5, 0.0] {
            let est = f.update(m);
            let (lo, hi) = if prev <= m { (prev, m) } else { (m, prev) };
            assert!(est >= lo && est <= hi, "{est} outside [{lo}, {hi}]");
            prev = est;
        }
    }

    #[test]
    fn test_covariance_shrinks_then_settles() {
        let mut f = filter();
        f.update(1.0);
        f.update(1.0);
        let p1 = f.covariance();
        f.update(1.0);
        assert!(f.covariance() < p1);
        assert!(f.covariance() > 0.0);
    }

    #[test]
    fn test_reset_clears_estimate() {
        let mut f = filter();
        f.update(3.0);
        f.update(4.0);
        f.reset();
        assert_eq!(f.estimate(), None);
        assert_eq!(f.covariance(), 1.0);
        assert_eq!(f.update(-1.0), -1.0);
    }

    #[test]
    fn test_axes_are_independent() {
        let config = FilterConfig::default();
        let mut smoother = PositionSmoother::new(&config);
        let first = smoother.update(39.9, 116.4);
        assert_eq!(first, SmoothedFix { lat: 39.9, lon: 116.4 });

        // Moving only in longitude leaves latitude untouched
        let second = smoother.update(39.9, 116.5);
        assert_eq!(second.lat, 39.9);
        assert!(second.lon > 116.4 && second.lon < 116.5);
    }
}
