//! Procedural fix stream generation.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracker::{distance::haversine_distance, models::Fix};

use crate::config::{BoundingBox, Region, StreamConfig};
use crate::profiles::{self, AthleteProfile};

/// Meters per degree of latitude, close enough for offsetting points.
const METERS_PER_DEGREE: f64 = 111_000.0;

/// Shortest and longest interval the generator will emit, in milliseconds.
/// Both lie strictly inside the tracker's accepted interval window.
const MIN_INTERVAL_MS: f64 = 1_100.0;
const MAX_INTERVAL_MS: f64 = 9_000.0;

/// A generated stream plus the ground truth it was drawn from.
#[derive(Debug, Clone)]
pub struct GeneratedStream {
    pub fixes: Vec<Fix>,
    /// Length of the noise-free path in meters.
    pub path_distance_m: f64,
    /// Sum of great-circle distances between consecutive reported fixes.
    pub reported_distance_m: f64,
}

impl GeneratedStream {
    pub fn duration_ms(&self) -> i64 {
        match (self.fixes.first(), self.fixes.last()) {
            (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
            _ => 0,
        }
    }
}

/// Generates synthetic fix streams with realistic characteristics.
pub struct FixStreamGenerator {
    stream: StreamConfig,
    bounds: BoundingBox,
    start_point: Option<(f64, f64)>,
    distance_meters: f64,
}

impl Default for FixStreamGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FixStreamGenerator {
    /// Creates a generator for a 1 km walk somewhere in Beijing.
    pub fn new() -> Self {
        Self {
            stream: StreamConfig::default(),
            bounds: Region::BEIJING,
            start_point: None,
            distance_meters: 1000.0,
        }
    }

    /// Creates a generator for a specific region.
    pub fn for_region(bounds: BoundingBox) -> Self {
        Self {
            bounds,
            ..Self::new()
        }
    }

    /// Sets the target path length.
    pub fn with_distance(mut self, meters: f64) -> Self {
        self.distance_meters = meters;
        self
    }

    /// Sets the starting point.
    pub fn with_start(mut self, lat: f64, lon: f64) -> Self {
        self.start_point = Some((lat, lon));
        self
    }

    /// Sets GPS jitter amount.
    pub fn with_gps_jitter(mut self, meters: f64) -> Self {
        self.stream.gps_jitter_m = meters;
        self
    }

    /// Sets the nominal interval and its jitter.
    pub fn with_interval(mut self, interval_ms: i64, jitter_ms: f64) -> Self {
        self.stream.interval_ms = interval_ms;
        self.stream.interval_jitter_ms = jitter_ms;
        self
    }

    /// Sets the reported accuracy range.
    pub fn with_accuracy_range(mut self, min_m: f64, max_m: f64) -> Self {
        self.stream.accuracy_range = (min_m, max_m);
        self
    }

    /// Fixes go out without the sensor speed, as most GPX logs do.
    pub fn without_speed_hint(mut self) -> Self {
        self.stream.with_speed_hint = false;
        self
    }

    /// Generates a stream using the specified movement profile.
    pub fn generate(&self, profile: &dyn AthleteProfile, rng: &mut impl Rng) -> GeneratedStream {
        let start = self
            .start_point
            .unwrap_or_else(|| self.bounds.random_point(rng));

        let interval = noise(self.stream.interval_jitter_ms);
        let jitter = noise(self.stream.gps_jitter_m / METERS_PER_DEGREE);

        let mut fixes = Vec::new();
        let mut current = start;
        let mut timestamp = self.stream.start_time_ms;
        let mut heading = rng.gen_range(0.0..std::f64::consts::TAU);
        let mut path_distance = 0.0;
        let mut speed = profile.base_speed_mps();

        fixes.push(self.observe(current, timestamp, speed, jitter.as_ref(), rng));

        while path_distance < self.distance_meters {
            let interval_ms = (self.stream.interval_ms as f64 + sample(interval.as_ref(), rng))
                .clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
                .round();
            let variance = profiles::sample_variance(profile, rng);
            speed = profiles::speed_with_variance(profile, variance);
            let step = speed * interval_ms / 1000.0;

            heading += rng.gen_range(-0.3..0.3);
            let lat = current.0 + (step * heading.cos()) / METERS_PER_DEGREE;
            let lon = current.1
                + (step * heading.sin()) / (METERS_PER_DEGREE * current.0.to_radians().cos());
            let (lat, lon, bounced) = self.apply_bounds(lat, lon, heading);
            heading = bounced;

            path_distance += haversine_distance(current.0, current.1, lat, lon);
            current = (lat, lon);
            timestamp += interval_ms as i64;
            fixes.push(self.observe(current, timestamp, speed, jitter.as_ref(), rng));
        }

        let reported_distance_m = fixes
            .windows(2)
            .map(|w| haversine_distance(w[0].lat, w[0].lon, w[1].lat, w[1].lon))
            .sum();

        GeneratedStream {
            fixes,
            path_distance_m: path_distance,
            reported_distance_m,
        }
    }

    /// What the receiver reports for a true position.
    fn observe(
        &self,
        (lat, lon): (f64, f64),
        timestamp_ms: i64,
        speed: f64,
        jitter: Option<&Normal<f64>>,
        rng: &mut impl Rng,
    ) -> Fix {
        let (min_acc, max_acc) = self.stream.accuracy_range;
        let accuracy = if max_acc > min_acc {
            rng.gen_range(min_acc..max_acc)
        } else {
            min_acc
        };

        let fix = Fix::new(
            lat + sample(jitter, rng),
            lon + sample(jitter, rng),
            timestamp_ms,
        )
        .with_accuracy(accuracy);

        if self.stream.with_speed_hint {
            fix.with_speed_hint(speed)
        } else {
            fix
        }
    }

    /// Applies bounds checking with heading reversal.
    fn apply_bounds(&self, lat: f64, lon: f64, heading: f64) -> (f64, f64, f64) {
        let b = &self.bounds;
        let mut new_heading = heading;

        let lat = if lat < b.min_lat {
            new_heading = std::f64::consts::PI - heading;
            b.min_lat + (b.min_lat - lat).min(0.001)
        } else if lat > b.max_lat {
            new_heading = std::f64::consts::PI - heading;
            b.max_lat - (lat - b.max_lat).min(0.001)
        } else {
            lat
        };

        let lon = if lon < b.min_lon {
            new_heading = -heading;
            b.min_lon + (b.min_lon - lon).min(0.001)
        } else if lon > b.max_lon {
            new_heading = -heading;
            b.max_lon - (lon - b.max_lon).min(0.001)
        } else {
            lon
        };

        (lat, lon, new_heading)
    }
}

/// Zero-mean noise, or `None` when the spread is zero or invalid.
fn noise(std_dev: f64) -> Option<Normal<f64>> {
    if std_dev > 0.0 {
        Normal::new(0.0, std_dev).ok()
    } else {
        None
    }
}

fn sample(dist: Option<&Normal<f64>>, rng: &mut impl Rng) -> f64 {
    dist.map_or(0.0, |d| d.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::{RunnerProfile, WalkerProfile};
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_generate_stream() {
        let generator = FixStreamGenerator::new().with_distance(500.0);
        let mut rng = StdRng::seed_from_u64(42);

        let stream = generator.generate(&WalkerProfile::default(), &mut rng);

        assert!(stream.fixes.len() > 50); // ~2.8 m per fix
        assert!(stream.path_distance_m >= 500.0);
        assert!(stream.fixes.iter().all(|f| f.accuracy.is_some()));
        assert!(stream.fixes.iter().all(|f| f.speed_hint.is_some()));
    }

    #[test]
    fn test_intervals_stay_inside_window() {
        let generator = FixStreamGenerator::new()
            .with_distance(800.0)
            .with_interval(2000, 3000.0);
        let mut rng = StdRng::seed_from_u64(3);

        let stream = generator.generate(&RunnerProfile::default(), &mut rng);

        for window in stream.fixes.windows(2) {
            let dt = window[1].timestamp_ms - window[0].timestamp_ms;
            assert!((1100..=9000).contains(&dt), "interval {dt} ms");
        }
    }

    #[test]
    fn test_noise_free_stream_matches_path() {
        let generator = FixStreamGenerator::new()
            .with_start(39.9, 116.4)
            .with_gps_jitter(0.0)
            .with_distance(300.0);
        let mut rng = StdRng::seed_from_u64(9);

        let stream = generator.generate(&WalkerProfile::steady(1.5), &mut rng);

        assert_eq!(stream.fixes[0].lat, 39.9);
        assert!((stream.reported_distance_m - stream.path_distance_m).abs() < 1e-6);
    }

    #[test]
    fn test_region_and_sensor_settings() {
        let generator = FixStreamGenerator::for_region(Region::SHANGHAI)
            .with_gps_jitter(0.0)
            .with_accuracy_range(4.0, 6.0)
            .without_speed_hint()
            .with_distance(600.0);
        let mut rng = StdRng::seed_from_u64(12);

        let stream = generator.generate(&WalkerProfile::default(), &mut rng);

        for fix in &stream.fixes {
            assert!(Region::SHANGHAI.contains(fix.lat, fix.lon));
            assert!((4.0..6.0).contains(&fix.accuracy.unwrap()));
            assert_eq!(fix.speed_hint, None);
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let generator = FixStreamGenerator::new().with_distance(200.0);
        let a = generator.generate(&WalkerProfile::default(), &mut StdRng::seed_from_u64(5));
        let b = generator.generate(&WalkerProfile::default(), &mut StdRng::seed_from_u64(5));
        assert_eq!(a.fixes, b.fixes);
    }
}
