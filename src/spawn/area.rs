//! Spawn positions, requests, and item handles.

use rand::Rng;
use serde::Serialize;

use crate::config::schema::SpawnArea;

/// Opaque handle to a spawned item, assigned by the [`ItemFactory`](super::ItemFactory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemHandle(pub u64);

impl std::fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// A point inside the spawn area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Everything the factory needs to create one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpawnRequest {
    pub position: Position,
    pub kind: String,
}

impl SpawnArea {
    /// Draws a uniformly random position inside the rectangle.
    ///
    /// Each axis is `min + (max - min) * u` with `u` in `[0, 1)`, so a
    /// degenerate or inverted edge pair never panics; validation rejects
    /// those before a spawner is built.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let u: f32 = rng.random();
        let v: f32 = rng.random();
        Position {
            x: (self.max_x - self.min_x).mul_add(u, self.min_x),
            y: (self.max_y - self.min_y).mul_add(v, self.min_y),
        }
    }
}
