//! Concrete devices composed from the engine.

mod mirror;

pub use mirror::{Gantry, PointingMirror};
