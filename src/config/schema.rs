//! Configuration schema types
//!
//! Static configuration loaded once at construction. Every field has a
//! default, so an empty section (or an omitted one) yields the stock
//! spawner: one item per second, at most 100 items, phase caps 5/6/8,
//! spawned inside a 34 x 18 rectangle centred on the origin.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::phase::Phase;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for a spawner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawnerConfig {
    /// Timing and population limits
    pub spawner: SpawnerSettings,

    /// Rectangle that spawn positions are drawn from
    pub area: SpawnArea,

    /// Per-phase counter caps
    pub phases: PhaseLimits,

    /// Stream identification and framing limits
    pub source: SourceSettings,
}

// ============================================================================
// Spawner Settings
// ============================================================================

/// Spawn timing and population limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawnerSettings {
    /// Time between spawns (humantime, e.g. `"1s"`, `"250ms"`)
    #[serde(with = "duration_str")]
    pub spawn_interval: Duration,

    /// Maximum number of spawns between resets
    pub max_count: u32,

    /// Scheduling signals per second driving the ticker
    pub tick_rate: u32,

    /// Seed for position sampling and random deletion (entropy when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Item kinds; each spawn picks one uniformly
    pub kinds: Vec<String>,
}

impl Default for SpawnerSettings {
    fn default() -> Self {
        Self {
            spawn_interval: Duration::from_secs(1),
            max_count: 100,
            tick_rate: 60,
            seed: None,
            kinds: vec!["item".to_string()],
        }
    }
}

impl SpawnerSettings {
    /// Period between scheduling signals, derived from `tick_rate`.
    ///
    /// A zero rate is clamped to one signal per second.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }
}

// ============================================================================
// Spawn Area
// ============================================================================

/// Axis-aligned spawn rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawnArea {
    /// Left edge
    pub min_x: f32,
    /// Right edge
    pub max_x: f32,
    /// Bottom edge
    pub min_y: f32,
    /// Top edge
    pub max_y: f32,
}

impl Default for SpawnArea {
    fn default() -> Self {
        Self {
            min_x: -17.0,
            max_x: 17.0,
            min_y: -9.0,
            max_y: 9.0,
        }
    }
}

// ============================================================================
// Phase Limits
// ============================================================================

/// Counter caps for each phase.
///
/// Reaching a cap fires that phase's bulk action exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhaseLimits {
    /// Cap for phase 1 (pause)
    pub max_count_phase1: u32,
    /// Cap for phase 2 (delete half, pause)
    pub max_count_phase2: u32,
    /// Cap for phase 3 (delete all, pause)
    pub max_count_phase3: u32,
}

impl Default for PhaseLimits {
    fn default() -> Self {
        Self {
            max_count_phase1: 5,
            max_count_phase2: 6,
            max_count_phase3: 8,
        }
    }
}

impl PhaseLimits {
    /// Returns the cap for `phase`; `Phase::Idle` has no counter and caps at 0.
    #[must_use]
    pub const fn cap(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Idle => 0,
            Phase::One => self.max_count_phase1,
            Phase::Two => self.max_count_phase2,
            Phase::Three => self.max_count_phase3,
        }
    }
}

// ============================================================================
// Source Settings
// ============================================================================

/// Identifies the watched stream and bounds the size of a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSettings {
    /// Watched path, e.g. `"jiggle/stream"`
    pub stream_path: String,

    /// Identifier of the remote store the path lives in
    pub endpoint: String,

    /// Largest accepted entry in bytes
    pub max_message_size: usize,
}

/// Default upper bound for a single stream entry (64 KB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            stream_path: "jiggle/stream".to_string(),
            endpoint: String::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl SourceSettings {
    /// Returns the stream path as an HTTP route (`/jiggle/stream`).
    #[must_use]
    pub fn route(&self) -> String {
        format!("/{}", self.stream_path.trim_matches('/'))
    }
}

// ============================================================================
// Duration (de)serialization
// ============================================================================

/// Serde adapter reading durations as humantime strings (`"1s"`, `"1500ms"`)
/// or bare numbers of seconds.
mod duration_str {
    use std::time::Duration;

    use serde::de::{self, Deserializer, Visitor};
    use serde::ser::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }

    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a duration such as \"1s\" or a number of seconds")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            humantime::parse_duration(v.trim()).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration must not be negative"))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Duration, E> {
            Duration::try_from_secs_f64(v).map_err(E::custom)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
