// Copyright 2018-2023 Developers of the Rand project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A PRNG wrapper that refuses to emit more entropy than it holds.
//!
//! Every [`Prng`] implementation in this crate is otherwise non-blocking:
//! a debit below zero just schedules a background reseed and keeps
//! producing output. [`EntropyBlockingPrng`] is the one exception named
//! by the concurrency model: before producing output it checks
//! `entropy_bits` against what the call is about to debit, and if that
//! would go negative it performs a *synchronous* reseed against its own
//! [`SeedSource`] — retried with the same backoff schedule the
//! [`crate::reseeder::ReseederLoop`] uses — before proceeding.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::core_prng::{bits_for_range, Prng};
use crate::error::Error;
use crate::seed_source::SeedSource;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Wraps `inner`, blocking on `source` instead of deferring to a
/// background reseeder whenever a call would debit more entropy than
/// `inner` currently holds.
pub struct EntropyBlockingPrng {
    inner: Arc<dyn Prng>,
    source: Arc<dyn SeedSource>,
}

impl EntropyBlockingPrng {
    /// Wrap `inner`, blocking on `source` for reseeds.
    pub fn new(inner: Arc<dyn Prng>, source: Arc<dyn SeedSource>) -> Self {
        EntropyBlockingPrng { inner, source }
    }

    /// Block until `inner` holds at least `needed` bits of entropy.
    fn ensure(&self, needed: i64) {
        if self.inner.entropy_bits() >= needed {
            return;
        }
        let length = self.inner.new_seed_length();
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match self.source.generate(length) {
                Ok(bytes) => {
                    let _ = self.inner.set_seed(&bytes);
                    return;
                }
                Err(_) => {
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}

impl Prng for EntropyBlockingPrng {
    fn next_bytes(&self, out: &mut [u8]) {
        self.ensure(8 * out.len() as i64);
        self.inner.next_bytes(out)
    }

    fn next_u32(&self) -> u32 {
        self.ensure(32);
        self.inner.next_u32()
    }

    fn next_u32_bound(&self, bound: u32) -> u32 {
        self.ensure(bits_for_range(bound as u64) as i64);
        self.inner.next_u32_bound(bound)
    }

    fn next_i32_range(&self, origin: i32, bound: i32) -> Result<i32, Error> {
        if bound <= origin {
            return Err(Error::InvalidBound { origin: origin as i64, bound: bound as i64 });
        }
        let range = bound as i64 - origin as i64;
        self.ensure(bits_for_range(range as u64).min(32) as i64);
        self.inner.next_i32_range(origin, bound)
    }

    fn next_u64(&self) -> u64 {
        self.ensure(64);
        self.inner.next_u64()
    }

    fn next_u64_bound(&self, bound: u64) -> u64 {
        self.ensure(bits_for_range(bound) as i64);
        self.inner.next_u64_bound(bound)
    }

    fn next_i64_range(&self, origin: i64, bound: i64) -> Result<i64, Error> {
        if bound <= origin {
            return Err(Error::InvalidBound { origin, bound });
        }
        self.ensure(64);
        self.inner.next_i64_range(origin, bound)
    }

    fn next_bool(&self) -> bool {
        self.ensure(1);
        self.inner.next_bool()
    }

    fn next_f32(&self) -> f32 {
        self.ensure(24);
        self.inner.next_f32()
    }

    fn next_f64(&self) -> f64 {
        self.ensure(53);
        self.inner.next_f64()
    }

    fn next_gaussian(&self) -> f64 {
        self.ensure(53);
        self.inner.next_gaussian()
    }

    fn with_probability(&self, p: f64) -> bool {
        if p <= 0.0 || p >= 1.0 {
            return self.inner.with_probability(p);
        }
        self.ensure(1);
        self.inner.with_probability(p)
    }

    fn set_seed(&self, seed: &[u8]) -> Result<(), Error> {
        self.inner.set_seed(seed)
    }

    fn seed(&self) -> Result<Vec<u8>, Error> {
        self.inner.seed()
    }

    fn entropy_bits(&self) -> i64 {
        self.inner.entropy_bits()
    }

    fn new_seed_length(&self) -> usize {
        self.inner.new_seed_length()
    }

    fn reseed_failed(&self) -> bool {
        self.inner.reseed_failed()
    }

    fn dump(&self) -> String {
        self.inner.dump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rngs::cellular_automaton::CellularAutomatonPrng;
    use crate::seed_source::FixedSeedSource;

    #[test]
    fn blocks_and_reseeds_on_exhaustion() {
        let inner: Arc<dyn Prng> =
            Arc::new(CellularAutomatonPrng::from_seed_bytes(&[0, 0, 0, 0]).unwrap());
        let source: Arc<dyn SeedSource> = Arc::new(FixedSeedSource::new(vec![7, 7, 7, 7]));
        let blocking = EntropyBlockingPrng::new(inner, source);

        while blocking.entropy_bits() > 0 {
            blocking.next_u32();
        }
        let before = blocking.seed().unwrap();
        blocking.next_u32();
        assert_ne!(blocking.seed().unwrap(), before);
        assert!(blocking.entropy_bits() >= 0);
    }

    #[test]
    fn never_blocks_while_entropy_is_sufficient() {
        let inner: Arc<dyn Prng> =
            Arc::new(CellularAutomatonPrng::from_seed_bytes(&[1, 1, 1, 1]).unwrap());
        let source: Arc<dyn SeedSource> = Arc::new(FixedSeedSource::new(vec![0]));
        let blocking = EntropyBlockingPrng::new(inner, source);
        let seed_before = blocking.seed().unwrap();
        blocking.next_bool();
        assert_eq!(blocking.seed().unwrap(), seed_before);
    }
}
