#![no_main]

use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand::rngs::StdRng;
use spawnstream::config::schema::PhaseLimits;
use spawnstream::phase::{Phase, PhaseController};
use spawnstream::spawn::ItemHandle;

fuzz_target!(|data: &[u8]| {
    let limits = PhaseLimits::default();
    let mut controller = PhaseController::new(limits);
    let mut rng = StdRng::seed_from_u64(0);
    let mut next = 0u64;

    // Even lead byte spawns an item, odd lead byte delivers a signal
    for pair in data.chunks(2) {
        if pair[0] % 2 == 0 {
            next += 1;
            controller.record_spawn(ItemHandle(next));
        } else if let Some(&v) = pair.get(1) {
            let _ = controller.handle_signal(i32::from(v % 12), &mut rng);
        }

        let state = controller.state();
        for phase in [Phase::One, Phase::Two, Phase::Three] {
            assert!(state.count(phase) <= limits.cap(phase));
        }
    }
});
