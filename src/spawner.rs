//! Spawner runtime.
//!
//! The [`Spawner`] wires the event source, phase controller, ticker, and
//! item factory into one cooperative loop. Ticks and stream entries are
//! serialized through a single `tokio::select!`, so the controller state
//! has exactly one writer and needs no locks.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::config::schema::SpawnerConfig;
use crate::error::SpawnerError;
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics::{self, EventOutcome};
use crate::phase::{CapAction, Phase, PhaseController, Reaction, Signal};
use crate::source::{EventSource, StreamEvent, Subscription, payload};
use crate::spawn::{ItemFactory, SpawnRequest, Ticker};

/// Kind used when the configuration lists none.
const FALLBACK_KIND: &str = "item";

/// Options for constructing a [`Spawner`].
pub struct SpawnerOptions<F> {
    /// Validated configuration.
    pub config: Arc<SpawnerConfig>,
    /// Stream the spawner subscribes to.
    pub source: Arc<dyn EventSource>,
    /// Creates and destroys items.
    pub factory: F,
    /// Event emitter for structured events.
    pub event_emitter: Arc<EventEmitter>,
    /// Seed override; falls back to `spawner.seed`, then to OS entropy.
    pub seed: Option<u64>,
    /// Token for cooperative shutdown.
    pub cancel: CancellationToken,
}

/// Point-in-time view of the spawner, served at `/status` and logged at
/// shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpawnerSnapshot {
    pub phase: Phase,
    pub counts: [u32; 3],
    pub spawning: bool,
    pub spawn_count: u32,
    pub max_count: u32,
    pub live_items: usize,
}

/// Work queued by an event handler for the next loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    ClearUpstream,
}

/// What woke the loop.
enum Step {
    Cancelled,
    Tick(Instant),
    Entry(Option<StreamEvent>),
}

/// Spawner runtime.
pub struct Spawner<F> {
    config: Arc<SpawnerConfig>,
    source: Arc<dyn EventSource>,
    factory: F,
    controller: PhaseController,
    ticker: Ticker,
    rng: StdRng,
    event_emitter: Arc<EventEmitter>,
    deferred: VecDeque<Deferred>,
    items_spawned: u64,
    run_id: Uuid,
    cancel: CancellationToken,
}

impl<F: ItemFactory> Spawner<F> {
    /// Creates a spawner from the given options.
    #[must_use]
    pub fn new(opts: SpawnerOptions<F>) -> Self {
        let rng = opts
            .seed
            .or(opts.config.spawner.seed)
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        Self {
            controller: PhaseController::new(opts.config.phases),
            ticker: Ticker::new(opts.config.spawner.spawn_interval),
            config: opts.config,
            source: opts.source,
            factory: opts.factory,
            rng,
            event_emitter: opts.event_emitter,
            deferred: VecDeque::new(),
            items_spawned: 0,
            run_id: Uuid::new_v4(),
            cancel: opts.cancel,
        }
    }

    /// The item factory.
    #[must_use]
    pub const fn factory(&self) -> &F {
        &self.factory
    }

    /// The phase controller.
    #[must_use]
    pub const fn controller(&self) -> &PhaseController {
        &self.controller
    }

    /// Current state as a serializable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SpawnerSnapshot {
        let state = self.controller.state();
        SpawnerSnapshot {
            phase: state.phase(),
            counts: state.counts(),
            spawning: state.is_spawning(),
            spawn_count: state.spawn_count(),
            max_count: self.config.spawner.max_count,
            live_items: self.controller.registry().len(),
        }
    }

    /// Runs until cancelled or until the source ends.
    ///
    /// A failed subscription is not fatal: it is logged and the spawner
    /// stays idle (no spawning, no events) until cancelled.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok`; source failures after subscribing end
    /// the stream and are logged.
    pub async fn run(&mut self) -> Result<(), SpawnerError> {
        let source_type = self.source.source_type();

        let mut subscription = match self.source.subscribe(self.cancel.clone()).await {
            Ok(subscription) => subscription,
            Err(e) => {
                error!(
                    source = %source_type,
                    error = %e,
                    "subscription failed; spawner idle until shutdown"
                );
                self.cancel.cancelled().await;
                self.emit_stopped("subscription failed");
                return Ok(());
            }
        };

        info!(
            source = %source_type,
            stream_path = %self.config.source.stream_path,
            endpoint = %self.config.source.endpoint,
            interval = ?self.config.spawner.spawn_interval,
            max_count = self.config.spawner.max_count,
            "spawner started"
        );
        self.event_emitter.emit(Event::SpawnerStarted {
            timestamp: Utc::now(),
            run_id: self.run_id,
            source: source_type.to_string(),
            stream_path: self.config.source.stream_path.clone(),
            endpoint: Some(self.config.source.endpoint.clone()).filter(|e| !e.is_empty()),
        });
        self.publish_status();

        let reason = self.main_loop(&mut subscription).await;

        // Teardown: finish queued work, then unsubscribe.
        self.run_deferred().await;
        drop(subscription);
        if let Err(e) = self.source.close().await {
            warn!(error = %e, "closing source failed");
        }

        let snapshot = self.snapshot();
        info!(reason, ?snapshot, "spawner stopped");
        self.emit_stopped(reason);
        Ok(())
    }

    /// Core loop. Returns the stop reason.
    async fn main_loop(&mut self, subscription: &mut Subscription) -> &'static str {
        let cancel = self.cancel.clone();
        let mut interval = tokio::time::interval(self.config.spawner.tick_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        loop {
            // Work deferred by the previous pass runs before anything else
            self.run_deferred().await;

            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => Step::Cancelled,
                now = interval.tick() => Step::Tick(now),
                entry = subscription.next() => Step::Entry(entry),
            };

            match step {
                Step::Cancelled => {
                    info!("spawner cancelled");
                    return "cancelled";
                }
                Step::Tick(now) => {
                    let dt = now.saturating_duration_since(last_tick);
                    last_tick = now;
                    self.tick(dt);
                }
                Step::Entry(Some(entry)) => self.handle_entry(entry),
                Step::Entry(None) => {
                    debug!("source closed; shutting down");
                    return "source closed";
                }
            }
        }
    }

    /// Advances the ticker by `dt` and spawns at most one item.
    fn tick(&mut self, dt: Duration) {
        if !self.ticker.advance(dt) {
            return;
        }
        if !self.controller.may_spawn(self.config.spawner.max_count) {
            trace!(
                spawning = self.controller.state().is_spawning(),
                spawn_count = self.controller.state().spawn_count(),
                "spawn gated"
            );
            return;
        }

        let position = self.config.area.sample(&mut self.rng);
        let kinds = &self.config.spawner.kinds;
        let kind = if kinds.is_empty() {
            FALLBACK_KIND.to_string()
        } else {
            kinds[self.rng.random_range(0..kinds.len())].clone()
        };
        let request = SpawnRequest { position, kind };

        let handle = self.factory.spawn_item(&request);
        self.controller.record_spawn(handle);
        self.items_spawned += 1;

        debug!(
            item = %handle,
            kind = %request.kind,
            spawn_count = self.controller.state().spawn_count(),
            "spawned"
        );
        metrics::record_spawn();
        metrics::set_live_items(self.controller.registry().len());
        self.publish_status();
    }

    /// Converts one stream entry to a signal and applies it.
    fn handle_entry(&mut self, entry: StreamEvent) {
        let value = match payload::to_signal(&entry.value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = ?entry.key, error = %e, "rejecting stream entry");
                metrics::record_event(EventOutcome::Rejected);
                self.event_emitter.emit(Event::EventRejected {
                    timestamp: Utc::now(),
                    key: entry.key,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let reaction = self.controller.handle_signal(value, &mut self.rng);
        self.apply_reaction(reaction);
    }

    /// Carries out the side effects the controller decided on.
    fn apply_reaction(&mut self, reaction: Reaction) {
        if reaction.is_ignored() {
            metrics::record_event(EventOutcome::Ignored);
            return;
        }
        metrics::record_event(EventOutcome::Applied);

        if let Some(transition) = reaction.transition {
            self.event_emitter.emit(Event::PhaseEntered {
                timestamp: Utc::now(),
                from: transition.from.index(),
                to: transition.to.index(),
                restarted: transition.restarted,
            });
        }

        let destroyed = reaction.destroyed.len();
        for handle in reaction.destroyed {
            self.factory.destroy_item(handle);
        }

        match reaction.signal {
            Signal::Reset => {
                metrics::record_reset();
                if destroyed > 0 {
                    self.emit_destroyed(destroyed, "reset");
                }
                self.event_emitter.emit(Event::StateReset {
                    timestamp: Utc::now(),
                    destroyed,
                });
            }
            Signal::Resume => {
                self.event_emitter.emit(Event::SpawningResumed {
                    timestamp: Utc::now(),
                });
            }
            Signal::Phase(_) | Signal::Ignored(_) => {}
        }

        if let Some(action) = reaction.action {
            if action != CapAction::Pause {
                self.emit_destroyed(destroyed, action.as_str());
            }
            self.event_emitter.emit(Event::SpawningPaused {
                timestamp: Utc::now(),
                phase: self.controller.state().phase().index(),
            });
        }

        if reaction.clear_upstream {
            self.deferred.push_back(Deferred::ClearUpstream);
        }

        let state = self.controller.state();
        metrics::set_current_phase(state.phase());
        metrics::set_spawning(state.is_spawning());
        metrics::set_live_items(self.controller.registry().len());
        self.publish_status();
    }

    /// Runs every queued deferred task.
    async fn run_deferred(&mut self) {
        while let Some(task) = self.deferred.pop_front() {
            match task {
                Deferred::ClearUpstream => {
                    let result = self.source.clear().await;
                    match &result {
                        Ok(()) => debug!("upstream stream cleared"),
                        Err(e) => warn!(error = %e, "clearing upstream stream failed"),
                    }
                    self.event_emitter.emit(Event::StreamCleared {
                        timestamp: Utc::now(),
                        success: result.is_ok(),
                    });
                }
            }
        }
    }

    fn emit_destroyed(&self, count: usize, reason: &'static str) {
        metrics::record_destroyed(reason, count);
        self.event_emitter.emit(Event::ItemsDestroyed {
            timestamp: Utc::now(),
            count,
            reason: reason.to_string(),
        });
    }

    fn emit_stopped(&self, reason: &str) {
        self.event_emitter.emit(Event::SpawnerStopped {
            timestamp: Utc::now(),
            reason: reason.to_string(),
            items_spawned: self.items_spawned,
        });
    }

    fn publish_status(&self) {
        self.source.publish_status(&self.snapshot());
    }
}

impl<F> std::fmt::Debug for Spawner<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spawner")
            .field("run_id", &self.run_id)
            .field("source", &self.source.source_type())
            .field("state", self.controller.state())
            .field("items_spawned", &self.items_spawned)
            .finish_non_exhaustive()
    }
}
