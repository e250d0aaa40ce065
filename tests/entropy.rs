//! Property 2 (spec §8): the entropy counter decreases by exactly the bits
//! a call debits, and never silently goes negative-then-resets on its own.
//! Property 3: `set_seed` raises the counter back up, never lowers it below
//! what was already banked.

use better_random::core_prng::Prng;
use better_random::rngs::SplittablePrng;

#[test]
fn next_u32_debits_32_bits() {
    let p = SplittablePrng::from_seed_bytes(&[0u8; 8]).unwrap();
    let before = p.entropy_bits();
    p.next_u32();
    assert_eq!(p.entropy_bits(), before - 32);
}

#[test]
fn next_u64_debits_64_bits() {
    let p = SplittablePrng::from_seed_bytes(&[0u8; 8]).unwrap();
    let before = p.entropy_bits();
    p.next_u64();
    assert_eq!(p.entropy_bits(), before - 64);
}

#[test]
fn next_bytes_debits_eight_bits_per_byte() {
    let p = SplittablePrng::from_seed_bytes(&[0u8; 8]).unwrap();
    let before = p.entropy_bits();
    let mut buf = [0u8; 10];
    p.next_bytes(&mut buf);
    assert_eq!(p.entropy_bits(), before - 80);
}

#[test]
fn next_bool_debits_one_bit() {
    let p = SplittablePrng::from_seed_bytes(&[0u8; 8]).unwrap();
    let before = p.entropy_bits();
    p.next_bool();
    assert_eq!(p.entropy_bits(), before - 1);
}

#[test]
fn entropy_goes_negative_past_exhaustion() {
    let p = SplittablePrng::from_seed_bytes(&[0u8; 8]).unwrap();
    while p.entropy_bits() > 0 {
        p.next_u32();
    }
    let before = p.entropy_bits();
    assert!(before <= 0);
    p.next_u32();
    assert_eq!(p.entropy_bits(), before - 32);
}

#[test]
fn set_seed_raises_entropy_but_never_lowers_it() {
    let p = SplittablePrng::from_seed_bytes(&[0u8; 8]).unwrap();
    p.next_u32();
    p.next_u32();
    let before = p.entropy_bits();
    // Reseeding with the same seed length reports the same seed-derived
    // entropy value; the counter must never drop below what was banked.
    p.set_seed(&[1u8; 8]).unwrap();
    assert!(p.entropy_bits() >= before);
}
