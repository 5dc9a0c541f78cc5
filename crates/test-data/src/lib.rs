//! Test data generation for the live tracker.
//!
//! This crate generates realistic fix streams, optionally laced with the
//! faults real receivers produce, to drive integration tests and manual
//! replays.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_data::prelude::*;
//!
//! let scenario = ScenarioBuilder::new()
//!     .with_profile(RunnerProfile::default())
//!     .with_distance(3000.0)
//!     .with_jumps(2, 150.0)
//!     .with_seed(42)
//!     .build();
//!
//! write_fix_log("run.gpx", &scenario.fixes)?;
//! ```

pub mod builders;
pub mod config;
pub mod gpx;
pub mod profiles;
pub mod sources;

// Re-export core types from the tracker crate
pub use tracker::models::Fix;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::Fix;
    pub use crate::builders::{Glitch, InjectedGlitch, Scenario, ScenarioBuilder};
    pub use crate::config::{BoundingBox, Region, StreamConfig};
    pub use crate::gpx::{WriteError, generate_gpx, generate_json_lines, write_fix_log};
    pub use crate::profiles::{
        AthleteProfile, CyclistProfile, RunnerProfile, WalkerProfile, sample_variance,
        speed_with_variance,
    };
    pub use crate::sources::{FixStreamGenerator, GeneratedStream};
}
