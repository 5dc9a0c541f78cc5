//! Movement profiles.
//!
//! Profiles define realistic travel speeds for different kinds of motion.
//! They are used by the fix stream generator to space fixes along a path.

mod cyclist;
mod runner;
mod walker;

pub use cyclist::CyclistProfile;
pub use runner::RunnerProfile;
pub use walker::WalkerProfile;

/// Trait for movement profiles.
pub trait AthleteProfile: Send + Sync {
    /// Typical sustained speed in meters per second.
    fn base_speed_mps(&self) -> f64;

    /// Step-to-step speed variance as a coefficient of variation (0.0 - 1.0).
    ///
    /// A value of 0.1 means typical variation of ±10%.
    fn variance(&self) -> f64;
}

/// Speed for one step, given a sampled variance factor.
pub fn speed_with_variance(profile: &dyn AthleteProfile, variance_factor: f64) -> f64 {
    (profile.base_speed_mps() * variance_factor).max(0.1) // never fully stationary
}

/// Samples a variance factor from normal distribution.
/// Returns a multiplier around 1.0.
pub fn sample_variance(profile: &dyn AthleteProfile, rng: &mut impl rand::Rng) -> f64 {
    use rand_distr::{Distribution, Normal};

    let std_dev = profile.variance();
    match Normal::new(1.0, std_dev) {
        Ok(normal) if std_dev > 0.0 => {
            let sample: f64 = normal.sample(rng);
            sample.clamp(0.7, 1.4)
        }
        _ => 1.0,
    }
}
