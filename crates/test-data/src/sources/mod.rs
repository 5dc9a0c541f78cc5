//! Fix stream sources.
//!
//! - [`FixStreamGenerator`]: random-walk fix streams driven by a movement profile

mod procedural;

pub use procedural::{FixStreamGenerator, GeneratedStream};
