//! Configuration types for test data generation.

use serde::{Deserialize, Serialize};

/// Geographic bounding box defined by southwest and northeast corners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude (south)
    pub min_lat: f64,
    /// Minimum longitude (west)
    pub min_lon: f64,
    /// Maximum latitude (north)
    pub max_lat: f64,
    /// Maximum longitude (east)
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Returns a random point within the bounding box.
    pub fn random_point(&self, rng: &mut impl rand::Rng) -> (f64, f64) {
        let lat = rng.gen_range(self.min_lat..self.max_lat);
        let lon = rng.gen_range(self.min_lon..self.max_lon);
        (lat, lon)
    }

    /// Returns the center of the bounding box.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Pre-defined geographic regions for test data generation.
#[derive(Debug, Clone, Copy)]
pub struct Region;

impl Region {
    /// Central Beijing, inside the shifted-datum region.
    pub const BEIJING: BoundingBox = BoundingBox::new(39.86, 116.32, 39.96, 116.46);

    /// Shanghai riverside, inside the shifted-datum region.
    pub const SHANGHAI: BoundingBox = BoundingBox::new(31.20, 121.44, 31.26, 121.52);

    /// Boulder, CO area. Outside the shifted-datum region, so display
    /// coordinates equal raw ones.
    pub const BOULDER: BoundingBox = BoundingBox::new(39.9, -105.5, 40.1, -105.2);
}

/// Timing and sensor characteristics of a generated fix stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Nominal time between fixes in milliseconds.
    pub interval_ms: i64,
    /// Standard deviation of the interval in milliseconds.
    pub interval_jitter_ms: f64,
    /// Horizontal position noise standard deviation in meters.
    pub gps_jitter_m: f64,
    /// Reported accuracy range (min, max) in meters.
    pub accuracy_range: (f64, f64),
    /// Whether fixes carry the sensor speed.
    pub with_speed_hint: bool,
    /// Timestamp of the first fix, Unix milliseconds.
    pub start_time_ms: i64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            interval_jitter_ms: 150.0,
            gps_jitter_m: 1.0,
            accuracy_range: (3.0, 12.0),
            with_speed_hint: true,
            start_time_ms: 1_714_550_400_000, // 2024-05-01T08:00:00Z
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_random_point_inside() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let (lat, lon) = Region::BEIJING.random_point(&mut rng);
            assert!(Region::BEIJING.contains(lat, lon));
        }
    }

    #[test]
    fn test_center() {
        let (lat, lon) = Region::BOULDER.center();
        assert!((lat - 40.0).abs() < 1e-9);
        assert!((lon + 105.35).abs() < 1e-9);
    }
}
