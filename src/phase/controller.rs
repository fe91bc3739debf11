//! Event-driven phase controller.
//!
//! The `PhaseController` owns the phase state and the spawn registry and
//! applies one integer signal at a time. It never touches the item factory
//! or the event source directly; every side effect is described in the
//! returned [`Reaction`] and carried out by the runtime.

use rand::Rng;
use tracing::{debug, info};

use crate::config::schema::PhaseLimits;
use crate::spawn::{ItemHandle, Registry};

use super::state::{Phase, PhaseState, Signal};

/// Bulk action fired when a phase counter reaches its cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapAction {
    /// Phase 1: stop spawning
    Pause,
    /// Phase 2: delete a random half of the live items, stop spawning
    DeleteHalf,
    /// Phase 3: delete every live item, stop spawning
    DeleteAll,
}

impl CapAction {
    /// The action bound to `phase`'s cap.
    #[must_use]
    pub const fn for_phase(phase: Phase) -> Option<Self> {
        match phase {
            Phase::Idle => None,
            Phase::One => Some(Self::Pause),
            Phase::Two => Some(Self::DeleteHalf),
            Phase::Three => Some(Self::DeleteAll),
        }
    }

    /// Label used for metrics and destroy events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::DeleteHalf => "delete_half",
            Self::DeleteAll => "delete_all",
        }
    }
}

/// A change of the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    /// `true` when the jump was out of sequence and all counters were zeroed
    pub restarted: bool,
}

/// Everything one signal did to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    /// How the raw value was classified
    pub signal: Signal,
    /// Phase change caused by this signal, if any
    pub transition: Option<PhaseTransition>,
    /// Counter of the current phase after the signal
    pub count: u32,
    /// Cap action that fired on this signal
    pub action: Option<CapAction>,
    /// Items removed from the registry; the caller must destroy them
    pub destroyed: Vec<ItemHandle>,
    /// Whether the upstream stream must be cleared on the next turn
    pub clear_upstream: bool,
}

impl Reaction {
    const fn new(signal: Signal, count: u32) -> Self {
        Self {
            signal,
            transition: None,
            count,
            action: None,
            destroyed: Vec::new(),
            clear_upstream: false,
        }
    }

    /// `true` when the signal left everything untouched.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self.signal, Signal::Ignored(_))
    }
}

/// Phase/count state machine over a stream of integer signals.
#[derive(Debug, Clone)]
pub struct PhaseController {
    state: PhaseState,
    limits: PhaseLimits,
    registry: Registry,
}

impl PhaseController {
    #[must_use]
    pub const fn new(limits: PhaseLimits) -> Self {
        Self {
            state: PhaseState::new(),
            limits,
            registry: Registry::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &PhaseState {
        &self.state
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn limits(&self) -> &PhaseLimits {
        &self.limits
    }

    /// Whether the ticker may spawn one more item under `max_count`.
    #[must_use]
    pub const fn may_spawn(&self, max_count: u32) -> bool {
        self.state.may_spawn(max_count)
    }

    /// Records an item the ticker just spawned.
    pub fn record_spawn(&mut self, handle: ItemHandle) {
        self.registry.push(handle);
        self.state.record_spawn();
    }

    /// Applies one signal.
    ///
    /// `rng` is only consulted when the phase-2 cap fires.
    pub fn handle_signal<R: Rng + ?Sized>(&mut self, value: i32, rng: &mut R) -> Reaction {
        let signal = Signal::classify(value);
        match signal {
            Signal::Reset => self.reset(signal),
            Signal::Resume => {
                self.state.set_spawning(true);
                info!("spawning resumed");
                Reaction::new(signal, self.state.count(self.state.phase()))
            }
            Signal::Ignored(v) => {
                debug!(value = v, "ignoring out-of-range signal");
                Reaction::new(signal, self.state.count(self.state.phase()))
            }
            Signal::Phase(target) => self.apply_phase(signal, target, rng),
        }
    }

    fn reset(&mut self, signal: Signal) -> Reaction {
        let from = self.state.phase();
        self.state.reset();
        let destroyed = self.registry.take_all();
        info!(from = %from, destroyed = destroyed.len(), "hard reset");

        let mut reaction = Reaction::new(signal, 0);
        reaction.destroyed = destroyed;
        reaction.clear_upstream = true;
        reaction
    }

    fn apply_phase<R: Rng + ?Sized>(
        &mut self,
        signal: Signal,
        target: Phase,
        rng: &mut R,
    ) -> Reaction {
        let transition = self.transition_to(target);
        let (count, reached) = self.state.increment(&self.limits);

        let mut reaction = Reaction::new(signal, count);
        reaction.transition = transition;
        debug!(phase = %target, count, cap = self.limits.cap(target), "phase counter");

        if reached {
            if let Some(action) = CapAction::for_phase(target) {
                reaction.destroyed = match action {
                    CapAction::Pause => Vec::new(),
                    CapAction::DeleteHalf => self.registry.take_half(rng),
                    CapAction::DeleteAll => self.registry.take_all(),
                };
                self.state.set_spawning(false);
                reaction.action = Some(action);
                info!(
                    phase = %target,
                    action = action.as_str(),
                    destroyed = reaction.destroyed.len(),
                    remaining = self.registry.len(),
                    "phase cap reached; spawning paused"
                );
            }
        }
        reaction
    }

    /// Moves to `target` if the transition rule allows it.
    ///
    /// From idle any phase may start; the direct successor advances with
    /// counters kept; any other phase restarts with counters zeroed. The
    /// current phase itself is a repeat and changes nothing.
    fn transition_to(&mut self, target: Phase) -> Option<PhaseTransition> {
        let from = self.state.phase();
        if from == target {
            return None;
        }

        let restarted = from != Phase::Idle && from.successor() != Some(target);
        if restarted {
            self.state.reset_counts();
        }
        self.state.set_phase(target);
        info!(from = %from, to = %target, restarted, "phase entered");

        Some(PhaseTransition {
            from,
            to: target,
            restarted,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn controller() -> PhaseController {
        PhaseController::new(PhaseLimits::default())
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    fn with_items(controller: &mut PhaseController, n: u64) {
        for i in 0..n {
            controller.record_spawn(ItemHandle(i));
        }
    }

    #[test]
    fn first_phase_signal_starts_phase() {
        let mut c = controller();
        let r = c.handle_signal(1, &mut rng());
        assert_eq!(
            r.transition,
            Some(PhaseTransition {
                from: Phase::Idle,
                to: Phase::One,
                restarted: false
            })
        );
        assert_eq!(r.count, 1);
        assert_eq!(c.state().phase(), Phase::One);
    }

    #[test]
    fn idle_may_start_at_any_phase() {
        let mut c = controller();
        let r = c.handle_signal(3, &mut rng());
        assert_eq!(c.state().phase(), Phase::Three);
        assert!(!r.transition.unwrap().restarted);
        assert_eq!(c.state().count(Phase::Three), 1);
    }

    #[test]
    fn five_ones_pause_on_fifth_and_sixth_is_clamped() {
        let mut c = controller();
        let mut rng = rng();
        for i in 1..=4 {
            let r = c.handle_signal(1, &mut rng);
            assert_eq!(r.count, i);
            assert!(r.action.is_none());
            assert!(c.state().is_spawning());
        }

        let fifth = c.handle_signal(1, &mut rng);
        assert_eq!(fifth.count, 5);
        assert_eq!(fifth.action, Some(CapAction::Pause));
        assert!(!c.state().is_spawning());

        let sixth = c.handle_signal(1, &mut rng);
        assert_eq!(sixth.count, 5);
        assert!(sixth.action.is_none());
        assert!(!c.state().is_spawning());
    }

    #[test]
    fn cap_does_not_refire_after_resume() {
        let mut c = controller();
        let mut rng = rng();
        for _ in 0..5 {
            c.handle_signal(1, &mut rng);
        }
        c.handle_signal(8, &mut rng);
        assert!(c.state().is_spawning());

        let r = c.handle_signal(1, &mut rng);
        assert!(r.action.is_none());
        assert!(c.state().is_spawning());
    }

    #[test]
    fn successor_keeps_counters() {
        let mut c = controller();
        let mut rng = rng();
        c.handle_signal(1, &mut rng);
        c.handle_signal(1, &mut rng);
        let r = c.handle_signal(2, &mut rng);
        assert!(!r.transition.unwrap().restarted);
        assert_eq!(c.state().counts(), [2, 1, 0]);
    }

    #[test]
    fn out_of_sequence_restarts() {
        let mut c = controller();
        let mut rng = rng();
        c.handle_signal(1, &mut rng);
        c.handle_signal(2, &mut rng);
        let r = c.handle_signal(1, &mut rng);
        assert_eq!(
            r.transition,
            Some(PhaseTransition {
                from: Phase::Two,
                to: Phase::One,
                restarted: true
            })
        );
        assert_eq!(c.state().counts(), [1, 0, 0]);

        // Skipping forward is also out of sequence
        let r = c.handle_signal(3, &mut rng);
        assert!(r.transition.unwrap().restarted);
        assert_eq!(c.state().counts(), [0, 0, 1]);
    }

    #[test]
    fn repeat_of_current_phase_only_counts() {
        let mut c = controller();
        let mut rng = rng();
        c.handle_signal(2, &mut rng);
        let r = c.handle_signal(2, &mut rng);
        assert!(r.transition.is_none());
        assert_eq!(r.count, 2);
    }

    #[test]
    fn phase_two_cap_deletes_half() {
        let mut c = controller();
        let mut rng = rng();
        with_items(&mut c, 11);
        c.handle_signal(1, &mut rng);
        for _ in 0..5 {
            assert!(c.handle_signal(2, &mut rng).action.is_none());
        }
        let r = c.handle_signal(2, &mut rng);
        assert_eq!(r.action, Some(CapAction::DeleteHalf));
        assert_eq!(r.destroyed.len(), 5);
        assert_eq!(c.registry().len(), 6);
        assert!(!c.state().is_spawning());
    }

    #[test]
    fn phase_three_cap_deletes_all() {
        let mut c = controller();
        let mut rng = rng();
        with_items(&mut c, 7);
        let mut last = None;
        for _ in 0..8 {
            last = Some(c.handle_signal(3, &mut rng));
        }
        let r = last.unwrap();
        assert_eq!(r.action, Some(CapAction::DeleteAll));
        assert_eq!(r.destroyed.len(), 7);
        assert!(c.registry().is_empty());
        assert!(!c.state().is_spawning());
    }

    #[test]
    fn reset_clears_everything_and_requests_clear() {
        let mut c = controller();
        let mut rng = rng();
        with_items(&mut c, 4);
        for _ in 0..5 {
            c.handle_signal(1, &mut rng);
        }
        let r = c.handle_signal(9, &mut rng);
        assert!(r.clear_upstream);
        assert_eq!(r.destroyed.len(), 4);
        assert_eq!(c.state(), &PhaseState::new());
        assert!(c.registry().is_empty());
    }

    #[test]
    fn ignored_values_change_nothing() {
        let mut c = controller();
        let mut rng = rng();
        c.handle_signal(2, &mut rng);
        let before = c.state().clone();
        for v in [0, 4, 7, 10, -3, i32::MAX, i32::MIN] {
            let r = c.handle_signal(v, &mut rng);
            assert!(r.is_ignored());
            assert!(r.destroyed.is_empty());
            assert!(!r.clear_upstream);
        }
        assert_eq!(c.state(), &before);
    }

    #[test]
    fn may_spawn_respects_gate_and_global_cap() {
        let mut c = controller();
        assert!(c.may_spawn(2));
        c.record_spawn(ItemHandle(1));
        c.record_spawn(ItemHandle(2));
        assert!(!c.may_spawn(2));
        assert_eq!(c.registry().len(), 2);
    }

    fn signal() -> impl Strategy<Value = i32> {
        prop_oneof![
            4 => 1..=3i32,
            1 => Just(8),
            1 => Just(9),
            1 => -5..20i32,
        ]
    }

    proptest! {
        #[test]
        fn counters_never_exceed_caps(
            signals in proptest::collection::vec(signal(), 0..200),
            caps in (1u32..10, 1u32..10, 1u32..10),
            seed in any::<u64>(),
        ) {
            let limits = PhaseLimits {
                max_count_phase1: caps.0,
                max_count_phase2: caps.1,
                max_count_phase3: caps.2,
            };
            let mut c = PhaseController::new(limits);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut next = 0u64;
            for v in signals {
                // interleave spawns so deletions have something to act on
                if c.may_spawn(u32::MAX) {
                    c.record_spawn(ItemHandle(next));
                    next += 1;
                }
                c.handle_signal(v, &mut rng);
                let counts = c.state().counts();
                prop_assert!(counts[0] <= caps.0);
                prop_assert!(counts[1] <= caps.1);
                prop_assert!(counts[2] <= caps.2);
            }
        }

        #[test]
        fn reset_from_any_state(
            signals in proptest::collection::vec(signal(), 0..100),
            items in 0u64..30,
        ) {
            let mut c = controller();
            let mut rng = rng();
            with_items(&mut c, items);
            for v in signals {
                c.handle_signal(v, &mut rng);
            }
            let r = c.handle_signal(9, &mut rng);
            prop_assert!(r.clear_upstream);
            prop_assert_eq!(c.state(), &PhaseState::new());
            prop_assert!(c.registry().is_empty());
        }

        #[test]
        fn resume_only_sets_spawning(
            signals in proptest::collection::vec(signal(), 0..100),
            items in 0u64..30,
        ) {
            let mut c = controller();
            let mut rng = rng();
            with_items(&mut c, items);
            for v in signals {
                c.handle_signal(v, &mut rng);
            }
            let before = c.clone();
            let r = c.handle_signal(8, &mut rng);
            prop_assert!(r.destroyed.is_empty());
            prop_assert!(c.state().is_spawning());
            prop_assert_eq!(c.state().phase(), before.state().phase());
            prop_assert_eq!(c.state().counts(), before.state().counts());
            prop_assert_eq!(c.state().spawn_count(), before.state().spawn_count());
            prop_assert_eq!(c.registry(), before.registry());
        }
    }
}
