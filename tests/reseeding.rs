//! Property 7 (spec §8): a PRNG registered with a `ReseederLoop` gets
//! reseeded in the background once its entropy counter crosses zero,
//! without the caller ever calling `set_seed` itself.

use std::sync::Arc;
use std::time::{Duration, Instant};

use better_random::core_prng::Prng;
use better_random::rngs::SplittablePrng;
use better_random::seed_source::FixedSeedSource;
use better_random::{Priority, ReseederLoop, SeedSource};

#[test]
fn background_reseed_replaces_exhausted_seed() {
    let source: Arc<dyn SeedSource> = Arc::new(FixedSeedSource::new(vec![42, 42, 42, 42, 42, 42, 42, 42]));
    let loop_ = ReseederLoop::new(source);
    let prng = SplittablePrng::from_seed_bytes(&[0u8; 8]).unwrap();
    prng.register_with_reseeder(Some(&loop_));
    assert_eq!(loop_.registered_count(), 1);

    let before = prng.seed().unwrap();
    while prng.entropy_bits() > 0 {
        prng.next_u32();
    }
    prng.next_u32(); // crosses zero, schedules a reseed

    let deadline = Instant::now() + Duration::from_millis(1000);
    let mut reseeded = false;
    while Instant::now() < deadline {
        if prng.seed().unwrap() != before {
            reseeded = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    loop_.stop();
    assert!(reseeded, "PRNG was not reseeded in the background within 1s");
}

#[test]
fn high_priority_loop_still_services_requests() {
    let source: Arc<dyn SeedSource> = Arc::new(FixedSeedSource::new(vec![1, 2, 3, 4, 5, 6, 7, 8]));
    let loop_ = ReseederLoop::with_priority(source, Priority::High);
    let prng = SplittablePrng::from_seed_bytes(&[9u8; 8]).unwrap();
    prng.register_with_reseeder(Some(&loop_));

    while prng.entropy_bits() > 0 {
        prng.next_u32();
    }
    prng.next_u32();

    let deadline = Instant::now() + Duration::from_millis(1000);
    while Instant::now() < deadline && prng.entropy_bits() < 64 {
        std::thread::sleep(Duration::from_millis(5));
    }
    loop_.stop();
    assert!(prng.entropy_bits() >= 64);
}
