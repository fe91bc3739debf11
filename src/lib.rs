//! `spawnstream` - timed item spawner driven by a phase state machine
//!
//! A [`spawn::Ticker`] paces item creation while a
//! [`phase::PhaseController`] reacts to integer signals read from an
//! external stream: phases 1, 2 and 3 accumulate counters whose caps pause
//! spawning, delete half the live items, or delete all of them; `8` resumes
//! and `9` resets everything and clears the stream. The [`spawner::Spawner`]
//! runtime ties both to an [`source::EventSource`] and an
//! [`spawn::ItemFactory`].

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phase;
pub mod source;
pub mod spawn;
pub mod spawner;
