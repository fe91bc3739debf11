//! Configuration module
//!
//! Loading and validation of the spawner's static configuration: spawn
//! timing, population cap, phase caps, spawn area, and stream identifiers.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
