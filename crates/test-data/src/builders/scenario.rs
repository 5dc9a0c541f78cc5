//! Fluent builder for constructing fix stream scenarios.

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracker::{distance::haversine_distance, models::Fix};

use crate::profiles::{AthleteProfile, CyclistProfile, RunnerProfile, WalkerProfile};
use crate::sources::{FixStreamGenerator, GeneratedStream};

/// Minimum spacing between injected glitches so their effects never overlap.
const GLITCH_SPACING: usize = 3;

/// A fault injected into an otherwise clean stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Glitch {
    /// The fix is displaced north by this many meters.
    Jump { meters: f64 },
    /// The fix is delivered twice with the same timestamp.
    Duplicate,
    /// The receiver goes quiet for this long before the fix.
    Gap { secs: f64 },
    /// The fix carries no accuracy estimate.
    MissingAccuracy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InjectedGlitch {
    /// Index of the affected fix in the clean stream.
    pub index: usize,
    pub glitch: Glitch,
}

/// A stream ready to replay, together with what a correct tracker should
/// report for it.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub fixes: Vec<Fix>,
    pub glitches: Vec<InjectedGlitch>,
    /// Distance a tracker should accumulate: every segment except those
    /// touching a jump or ending a gap.
    pub expected_distance_m: f64,
    pub clean: GeneratedStream,
}

impl Scenario {
    /// Fixes the tracker should refuse, counting the warm-up samples.
    pub fn expected_rejections(&self, warm_up_samples: u32) -> usize {
        let warm_up = warm_up_samples.saturating_sub(1) as usize;
        let faults: usize = self
            .glitches
            .iter()
            .map(|g| match g.glitch {
                Glitch::Jump { .. } => 2,
                Glitch::Duplicate | Glitch::Gap { .. } => 1,
                Glitch::MissingAccuracy => 0,
            })
            .sum();
        warm_up + faults
    }

    pub fn count(&self, matches: impl Fn(&Glitch) -> bool) -> usize {
        self.glitches.iter().filter(|g| matches(&g.glitch)).count()
    }
}

/// Builder for fix stream scenarios.
///
/// # Example
///
/// ```rust,ignore
/// let scenario = ScenarioBuilder::new()
///     .with_profile(RunnerProfile::default())
///     .with_distance(2500.0)
///     .with_jumps(3, 150.0)
///     .with_gaps(1, 20.0)
///     .with_seed(7)
///     .build();
/// ```
pub struct ScenarioBuilder {
    generator: FixStreamGenerator,
    profile: Box<dyn AthleteProfile>,
    seed: u64,
    skip_first: usize,
    jumps: usize,
    jump_meters: f64,
    duplicates: usize,
    gaps: usize,
    gap_secs: f64,
    missing_accuracy: usize,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            generator: FixStreamGenerator::new(),
            profile: Box::new(WalkerProfile::default()),
            seed: 0,
            skip_first: 8,
            jumps: 0,
            jump_meters: 120.0,
            duplicates: 0,
            gaps: 0,
            gap_secs: 15.0,
            missing_accuracy: 0,
        }
    }

    /// A city walk with a handful of every fault.
    pub fn noisy_walk() -> Self {
        Self::new()
            .with_profile(WalkerProfile::with_speed(4.5))
            .with_distance(1500.0)
            .with_jumps(3, 120.0)
            .with_duplicates(2)
            .with_gaps(2, 20.0)
            .with_missing_accuracy(3)
    }

    /// A clean run long enough to pass the default goal.
    pub fn goal_run() -> Self {
        Self::new()
            .with_profile(RunnerProfile::with_pace(5.0))
            .with_distance(2600.0)
    }

    /// A 60 km/h ride on an exact two-second cadence, fast enough to hit the
    /// speed ceiling while most steps stay under the jump threshold.
    pub fn fast_ride() -> Self {
        Self::new()
            .with_generator(FixStreamGenerator::new().with_interval(2000, 0.0))
            .with_profile(CyclistProfile::with_speed(60.0))
            .with_distance(1500.0)
    }

    pub fn with_generator(mut self, generator: FixStreamGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_profile(mut self, profile: impl AthleteProfile + 'static) -> Self {
        self.profile = Box::new(profile);
        self
    }

    pub fn with_distance(mut self, meters: f64) -> Self {
        self.generator = self.generator.with_distance(meters);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Keeps the first `n` fixes clean so faults land after warm-up.
    pub fn skip_first(mut self, n: usize) -> Self {
        self.skip_first = n;
        self
    }

    pub fn with_jumps(mut self, count: usize, meters: f64) -> Self {
        self.jumps = count;
        self.jump_meters = meters;
        self
    }

    pub fn with_duplicates(mut self, count: usize) -> Self {
        self.duplicates = count;
        self
    }

    pub fn with_gaps(mut self, count: usize, secs: f64) -> Self {
        self.gaps = count;
        self.gap_secs = secs;
        self
    }

    pub fn with_missing_accuracy(mut self, count: usize) -> Self {
        self.missing_accuracy = count;
        self
    }

    /// Generates the clean stream and injects the requested faults.
    ///
    /// Faults are placed on distinct, spaced-out fixes. When the stream is too
    /// short for all of them, the surplus is dropped.
    pub fn build(self) -> Scenario {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let clean = self.generator.generate(self.profile.as_ref(), &mut rng);

        let mut candidates: Vec<usize> = (self.skip_first.max(1)..clean.fixes.len().saturating_sub(1))
            .step_by(GLITCH_SPACING)
            .collect();
        candidates.shuffle(&mut rng);

        let requested = std::iter::repeat_n(Glitch::Jump { meters: self.jump_meters }, self.jumps)
            .chain(std::iter::repeat_n(Glitch::Duplicate, self.duplicates))
            .chain(std::iter::repeat_n(Glitch::Gap { secs: self.gap_secs }, self.gaps))
            .chain(std::iter::repeat_n(Glitch::MissingAccuracy, self.missing_accuracy));

        let mut glitches: Vec<InjectedGlitch> = candidates
            .into_iter()
            .zip(requested)
            .map(|(index, glitch)| InjectedGlitch { index, glitch })
            .collect();
        glitches.sort_by_key(|g| g.index);

        let mut fixes = clean.fixes.clone();
        // Whether the segment ending at each fix should count toward distance.
        let mut counts: Vec<bool> = (0..fixes.len()).map(|i| i > 0).collect();

        // Back to front, so insertions and time shifts leave earlier indices alone.
        for injected in glitches.iter().rev() {
            let i = injected.index;
            match injected.glitch {
                Glitch::Jump { meters } => {
                    fixes[i].lat += meters / 111_000.0;
                    counts[i] = false;
                    counts[i + 1] = false;
                }
                Glitch::Duplicate => {
                    fixes.insert(i + 1, fixes[i]);
                    counts.insert(i + 1, true);
                }
                Glitch::Gap { secs } => {
                    let shift = (secs * 1000.0) as i64;
                    for fix in &mut fixes[i..] {
                        fix.timestamp_ms += shift;
                    }
                    counts[i] = false;
                }
                Glitch::MissingAccuracy => fixes[i].accuracy = None,
            }
        }

        let expected_distance_m = (1..fixes.len())
            .filter(|&j| counts[j])
            .map(|j| {
                let (a, b) = (&fixes[j - 1], &fixes[j]);
                haversine_distance(a.lat, a.lon, b.lat, b.lon)
            })
            .sum();

        Scenario {
            fixes,
            glitches,
            expected_distance_m,
            clean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_scenario_keeps_every_segment() {
        let scenario = ScenarioBuilder::new().with_distance(300.0).with_seed(1).build();

        assert!(scenario.glitches.is_empty());
        assert_eq!(scenario.fixes, scenario.clean.fixes);
        assert!((scenario.expected_distance_m - scenario.clean.reported_distance_m).abs() < 1e-6);
        assert_eq!(scenario.expected_rejections(5), 4);
    }

    #[test]
    fn test_noisy_walk_injects_everything() {
        let scenario = ScenarioBuilder::noisy_walk().with_seed(11).build();

        assert_eq!(scenario.count(|g| matches!(g, Glitch::Jump { .. })), 3);
        assert_eq!(scenario.count(|g| *g == Glitch::Duplicate), 2);
        assert_eq!(scenario.count(|g| matches!(g, Glitch::Gap { .. })), 2);
        assert_eq!(scenario.count(|g| *g == Glitch::MissingAccuracy), 3);
        assert_eq!(scenario.fixes.len(), scenario.clean.fixes.len() + 2);
        assert_eq!(scenario.expected_rejections(5), 4 + 6 + 2 + 2);
        assert!(scenario.expected_distance_m < scenario.clean.reported_distance_m);
    }

    #[test]
    fn test_glitches_are_spaced_and_after_warm_up() {
        let scenario = ScenarioBuilder::noisy_walk().with_seed(4).build();

        assert!(scenario.glitches.iter().all(|g| g.index >= 8));
        for pair in scenario.glitches.windows(2) {
            assert!(pair[1].index - pair[0].index >= GLITCH_SPACING);
        }
    }

    #[test]
    fn test_gap_shifts_following_timestamps() {
        let scenario = ScenarioBuilder::new()
            .with_distance(200.0)
            .with_gaps(1, 30.0)
            .with_seed(2)
            .build();
        let i = scenario.glitches[0].index;

        let dt = scenario.fixes[i].timestamp_ms - scenario.fixes[i - 1].timestamp_ms;
        assert!(dt > 30_000);
        let last = scenario.fixes.len() - 1;
        assert_eq!(
            scenario.fixes[last].timestamp_ms,
            scenario.clean.fixes[last].timestamp_ms + 30_000
        );
    }

    #[test]
    fn test_short_stream_drops_surplus_glitches() {
        let scenario = ScenarioBuilder::new()
            .with_distance(20.0)
            .with_jumps(50, 100.0)
            .with_seed(3)
            .build();
        assert!(scenario.glitches.len() < 50);
    }
}
