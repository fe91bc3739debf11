//! Phase state machine
//!
//! Tracks which of three phases the stream is in and how many signals each
//! phase has seen, and decides when to pause spawning or delete items.
//!
//! # Architecture
//!
//! - [`PhaseState`]: current phase, per-phase counters, spawning gate, spawn counter
//! - [`Signal`]: classification of a raw integer (reset, resume, phase, ignored)
//! - [`PhaseController`]: applies signals and reports side effects as a [`Reaction`]

pub mod controller;
pub mod state;

pub use controller::{CapAction, PhaseController, PhaseTransition, Reaction};
pub use state::{Phase, PhaseState, RESET_SIGNAL, RESUME_SIGNAL, Signal};
