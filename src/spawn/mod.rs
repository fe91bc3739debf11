//! Item spawning
//!
//! - [`Ticker`]: periodic trigger measuring time between spawns
//! - [`Registry`]: live item handles in insertion order
//! - [`ItemFactory`]: seam to whatever actually creates items
//! - [`area`]: spawn positions and requests

pub mod area;
pub mod factory;
pub mod registry;
pub mod ticker;

pub use area::{ItemHandle, Position, SpawnRequest};
pub use factory::{ItemFactory, RecordingFactory};
pub use registry::Registry;
pub use ticker::Ticker;
