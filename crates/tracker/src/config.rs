//! Tunable thresholds and collaborator options.
//!
//! Every field has a default, so a config file only needs to list what it
//! overrides. Environment variables take precedence over the file.

use std::{env, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Top-level tracker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub gates: GateConfig,
    /// Distance in meters that marks the session goal as reached.
    pub goal_distance_m: f64,
    pub filter: FilterConfig,
    pub watch: WatchOptions,
    pub map: MapConfig,
    pub time_base: TimeBase,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            gates: GateConfig::default(),
            goal_distance_m: 2000.0,
            filter: FilterConfig::default(),
            watch: WatchOptions::default(),
            map: MapConfig::default(),
            time_base: TimeBase::default(),
        }
    }
}

/// Thresholds for the sample sanity gates and clamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Samples counted before rates are derived.
    pub warm_up_samples: u32,
    /// Exclusive lower bound on the interval between fixes.
    pub min_interval_secs: f64,
    /// Exclusive upper bound on the interval between fixes.
    pub max_interval_secs: f64,
    /// Steps longer than this are treated as glitches.
    pub max_step_distance_m: f64,
    /// Accuracy radius at which a raw rate gets zero weight.
    pub accuracy_trust_radius_m: f64,
    pub max_speed_mps: f64,
    pub max_acceleration_mps2: f64,
    /// Whether plausible steps between warm-up fixes count toward distance.
    pub accumulate_during_warm_up: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            warm_up_samples: 5,
            min_interval_secs: 1.0,
            max_interval_secs: 10.0,
            max_step_distance_m: 50.0,
            accuracy_trust_radius_m: 50.0,
            max_speed_mps: 10.0,
            max_acceleration_mps2: 3.0,
            accumulate_during_warm_up: true,
        }
    }
}

/// Noise terms for the per-axis position filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub process_noise: f64,
    pub measurement_noise: f64,
    pub initial_covariance: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-5,
            measurement_noise: 1e-4,
            initial_covariance: 1.0,
        }
    }
}

/// Options handed to the position source when subscribing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    pub enable_high_accuracy: bool,
    /// Oldest cached fix the source may hand out, in milliseconds.
    pub maximum_age_ms: u64,
    /// How long the source may wait for a fix before failing with a timeout.
    pub timeout_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            maximum_age_ms: 0,
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial map center as (lon, lat) in the display frame.
    pub center: (f64, f64),
    pub zoom: u8,
    /// Render the smoothed position instead of the raw fix.
    pub smooth_display: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: (116.397428, 39.90923),
            zoom: 15,
            smooth_display: true,
        }
    }
}

/// Where "now" comes from when computing duration and average speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBase {
    /// Wall clock; session start is recorded at `start`.
    #[default]
    WallClock,
    /// Latest fix timestamp; session start is the first fix. Used for replays.
    FixTimestamps,
}

impl TrackerConfig {
    /// Loads the config named by `TRACKER_CONFIG` (or defaults), then applies
    /// environment overrides and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("TRACKER_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        self.goal_distance_m = env_or("TRACKER_GOAL_METERS", self.goal_distance_m);
        self.gates.warm_up_samples = env_or("TRACKER_WARM_UP_SAMPLES", self.gates.warm_up_samples);
        self.gates.max_speed_mps = env_or("TRACKER_MAX_SPEED_MPS", self.gates.max_speed_mps);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.filter;
        if f.process_noise <= 0.0 || f.measurement_noise <= 0.0 || f.initial_covariance <= 0.0 {
            return Err(ConfigError::Invalid(
                "filter noise terms must be positive".to_string(),
            ));
        }

        let g = &self.gates;
        if g.min_interval_secs < 0.0 || g.min_interval_secs >= g.max_interval_secs {
            return Err(ConfigError::Invalid(format!(
                "interval window [{}, {}] is empty",
                g.min_interval_secs, g.max_interval_secs
            )));
        }
        if g.max_step_distance_m < 0.0
            || g.max_speed_mps < 0.0
            || g.max_acceleration_mps2 < 0.0
            || self.goal_distance_m < 0.0
        {
            return Err(ConfigError::Invalid(
                "ceilings and goal must not be negative".to_string(),
            ));
        }
        if g.accuracy_trust_radius_m <= 0.0 {
            return Err(ConfigError::Invalid(
                "accuracy trust radius must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(fallback)
}
