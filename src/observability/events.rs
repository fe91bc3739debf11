//! Structured event stream for the spawner.
//!
//! Discrete, typed events emitted while the spawner runs. Events are
//! serialized as newline-delimited JSON (JSONL) and include a monotonically
//! increasing sequence number for ordering guarantees.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during spawner operation.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The spawner subscribed to its source and started ticking.
    SpawnerStarted {
        /// When the spawner started.
        timestamp: DateTime<Utc>,
        /// Identifier of this run, shared by every event it emits.
        run_id: Uuid,
        /// Source type (e.g. `"stdio"`, `"http"`).
        source: String,
        /// Watched stream path.
        stream_path: String,
        /// Upstream store endpoint, when one is configured.
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },

    /// The spawner has stopped.
    SpawnerStopped {
        /// When the spawner stopped.
        timestamp: DateTime<Utc>,
        /// Human-readable stop reason.
        reason: String,
        /// Total items spawned over the whole run.
        items_spawned: u64,
    },

    /// One item was created.
    ItemSpawned {
        /// When the item was created.
        timestamp: DateTime<Utc>,
        /// Handle assigned by the factory.
        item: String,
        /// Item kind.
        kind: String,
        /// Spawn position, x.
        x: f32,
        /// Spawn position, y.
        y: f32,
    },

    /// A batch of items was destroyed.
    ItemsDestroyed {
        /// When the batch was destroyed.
        timestamp: DateTime<Utc>,
        /// Number of items destroyed.
        count: usize,
        /// Why (`"delete_half"`, `"delete_all"`, `"reset"`).
        reason: String,
    },

    /// The controller moved to a new phase.
    PhaseEntered {
        /// When the transition occurred.
        timestamp: DateTime<Utc>,
        /// Phase index before the transition.
        from: u8,
        /// Phase index after the transition.
        to: u8,
        /// Whether the counters were zeroed (out-of-sequence jump).
        restarted: bool,
    },

    /// A phase cap paused spawning.
    SpawningPaused {
        /// When spawning was paused.
        timestamp: DateTime<Utc>,
        /// Phase whose cap was reached.
        phase: u8,
    },

    /// A resume signal re-enabled spawning.
    SpawningResumed {
        /// When spawning was resumed.
        timestamp: DateTime<Utc>,
    },

    /// A reset signal returned the controller to its initial state.
    StateReset {
        /// When the reset happened.
        timestamp: DateTime<Utc>,
        /// Items destroyed by the reset.
        destroyed: usize,
    },

    /// A stream entry could not be read as an integer.
    EventRejected {
        /// When the entry was rejected.
        timestamp: DateTime<Utc>,
        /// Stream key of the entry, if the source provides one.
        key: Option<String>,
        /// Why it was rejected.
        reason: String,
    },

    /// The upstream stream was cleared after a reset.
    StreamCleared {
        /// When the clear completed.
        timestamp: DateTime<Utc>,
        /// Whether the source accepted the clear.
        success: bool,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) increments the sequence counter,
/// serializes the event as a single JSON line, and flushes the underlying
/// writer. Serialization or I/O failures are dropped.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    ///
    /// stdout is reserved for the stdio source's clear acknowledgements.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
