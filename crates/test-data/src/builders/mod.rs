//! Scenario builders that combine generated streams with injected faults.

mod scenario;

pub use scenario::{Glitch, InjectedGlitch, Scenario, ScenarioBuilder};
