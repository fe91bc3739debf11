//! Phase state representation
//!
//! Plain owned state for the current phase, the per-phase counters, the
//! spawning gate, and the spawn counter. The controller is the only writer;
//! everything runs on one task, so no atomics or locks are involved.

use serde::Serialize;

use crate::config::schema::PhaseLimits;

/// Signal value that triggers a hard reset.
pub const RESET_SIGNAL: i32 = 9;

/// Signal value that re-enables spawning.
pub const RESUME_SIGNAL: i32 = 8;

/// One of the three stages, or `Idle` before the first phase signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum Phase {
    /// No phase signal received since start or the last reset
    #[default]
    Idle,
    /// Counting toward a pause
    One,
    /// Counting toward deleting half the items
    Two,
    /// Counting toward deleting every item
    Three,
}

impl Phase {
    /// Maps a phase signal (`1..=3`) to its phase.
    #[must_use]
    pub const fn from_signal(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            _ => None,
        }
    }

    /// Numeric index, `0` for `Idle`.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// The phase that follows this one in the 1 -> 2 -> 3 sequence.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::One),
            Self::One => Some(Self::Two),
            Self::Two => Some(Self::Three),
            Self::Three => None,
        }
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> Self {
        phase.index()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Classification of an integer signal read from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// `9`: hard reset
    Reset,
    /// `8`: resume spawning
    Resume,
    /// `1..=3`: count toward the given phase's cap
    Phase(Phase),
    /// Anything else; carries the raw value for logging
    Ignored(i32),
}

impl Signal {
    /// Classifies a raw integer.
    #[must_use]
    pub const fn classify(value: i32) -> Self {
        match value {
            RESET_SIGNAL => Self::Reset,
            RESUME_SIGNAL => Self::Resume,
            v => match Phase::from_signal(v) {
                Some(phase) => Self::Phase(phase),
                None => Self::Ignored(v),
            },
        }
    }
}

/// Phase, counters, spawning gate and spawn counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseState {
    phase: Phase,
    counts: [u32; 3],
    spawning: bool,
    spawn_count: u32,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseState {
    /// Fresh state: idle, zero counters, spawning enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Idle,
            counts: [0; 3],
            spawning: true,
            spawn_count: 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Counter for `phase`; `Idle` always reads 0.
    #[must_use]
    pub const fn count(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Idle => 0,
            Phase::One => self.counts[0],
            Phase::Two => self.counts[1],
            Phase::Three => self.counts[2],
        }
    }

    /// All three counters in phase order.
    #[must_use]
    pub const fn counts(&self) -> [u32; 3] {
        self.counts
    }

    /// Whether the ticker may spawn (before the global cap is considered).
    #[must_use]
    pub const fn is_spawning(&self) -> bool {
        self.spawning
    }

    /// Spawns since start or the last reset.
    #[must_use]
    pub const fn spawn_count(&self) -> u32 {
        self.spawn_count
    }

    /// Whether one more spawn is allowed under `max_count`.
    #[must_use]
    pub const fn may_spawn(&self, max_count: u32) -> bool {
        self.spawning && self.spawn_count < max_count
    }

    pub(crate) const fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) const fn set_spawning(&mut self, spawning: bool) {
        self.spawning = spawning;
    }

    pub(crate) const fn record_spawn(&mut self) {
        self.spawn_count = self.spawn_count.saturating_add(1);
    }

    pub(crate) const fn reset_counts(&mut self) {
        self.counts = [0; 3];
    }

    /// Increments the counter of the current phase, clamped to its cap.
    ///
    /// Returns the new count and whether this call moved the counter onto
    /// the cap. A counter already at the cap stays put and reports `false`,
    /// so cap actions fire once per run of a phase.
    pub(crate) fn increment(&mut self, limits: &PhaseLimits) -> (u32, bool) {
        let cap = limits.cap(self.phase);
        let Some(slot) = self.slot_mut() else {
            return (0, false);
        };
        let before = *slot;
        let after = before.saturating_add(1).min(cap);
        *slot = after;
        (after, after == cap && before < cap)
    }

    /// Hard reset: idle, zero counters, spawning enabled, spawn counter zeroed.
    pub(crate) const fn reset(&mut self) {
        *self = Self::new();
    }

    fn slot_mut(&mut self) -> Option<&mut u32> {
        match self.phase {
            Phase::Idle => None,
            Phase::One => Some(&mut self.counts[0]),
            Phase::Two => Some(&mut self.counts[1]),
            Phase::Three => Some(&mut self.counts[2]),
        }
    }
}
