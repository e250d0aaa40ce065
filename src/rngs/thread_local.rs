// Copyright 2018-2023 Developers of the Rand project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A per-thread PRNG built from a supplier closure, the same shape as
//! the teacher's `rand_trng::ThreadRng` except parameterized: instead of
//! one process-wide `thread_local!` singleton, each [`ThreadLocalPrng`]
//! instance gets its own slot in a per-thread registry keyed by an
//! instance id, so an application can hold any number of independently
//! seeded thread-local PRNGs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core_prng::Prng;
use crate::error::Error;

thread_local! {
    static REGISTRY: RefCell<HashMap<u64, Arc<dyn Prng>>> = RefCell::new(HashMap::new());
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A PRNG whose underlying instance is created lazily, once per thread,
/// by a supplier closure.
///
/// `set_seed` is a documented no-op: reseeding a per-thread instance is
/// the reseeder's job (see [`crate::rngs::reseeding_thread_local`]), not
/// something a caller does directly against one thread's view.
pub struct ThreadLocalPrng {
    id: u64,
    supplier: Arc<dyn Fn() -> Arc<dyn Prng> + Send + Sync>,
}

impl ThreadLocalPrng {
    /// Build a new instance; `supplier` is called at most once per
    /// thread, the first time that thread calls any `next_*` method.
    pub fn new<F>(supplier: F) -> Self
    where
        F: Fn() -> Arc<dyn Prng> + Send + Sync + 'static,
    {
        ThreadLocalPrng { id: NEXT_ID.fetch_add(1, Ordering::Relaxed), supplier: Arc::new(supplier) }
    }

    fn with_current<R>(&self, f: impl FnOnce(&Arc<dyn Prng>) -> R) -> R {
        REGISTRY.with(|reg| {
            let mut reg = reg.borrow_mut();
            let current = reg.entry(self.id).or_insert_with(|| (self.supplier)());
            f(current)
        })
    }
}

impl Prng for ThreadLocalPrng {
    fn next_bytes(&self, out: &mut [u8]) {
        self.with_current(|p| p.next_bytes(out))
    }
    fn next_u32(&self) -> u32 {
        self.with_current(|p| p.next_u32())
    }
    fn next_u32_bound(&self, bound: u32) -> u32 {
        self.with_current(|p| p.next_u32_bound(bound))
    }
    fn next_i32_range(&self, origin: i32, bound: i32) -> Result<i32, Error> {
        self.with_current(|p| p.next_i32_range(origin, bound))
    }
    fn next_u64(&self) -> u64 {
        self.with_current(|p| p.next_u64())
    }
    fn next_u64_bound(&self, bound: u64) -> u64 {
        self.with_current(|p| p.next_u64_bound(bound))
    }
    fn next_i64_range(&self, origin: i64, bound: i64) -> Result<i64, Error> {
        self.with_current(|p| p.next_i64_range(origin, bound))
    }
    fn next_bool(&self) -> bool {
        self.with_current(|p| p.next_bool())
    }
    fn next_f32(&self) -> f32 {
        self.with_current(|p| p.next_f32())
    }
    fn next_f64(&self) -> f64 {
        self.with_current(|p| p.next_f64())
    }
    fn next_gaussian(&self) -> f64 {
        self.with_current(|p| p.next_gaussian())
    }
    fn with_probability(&self, p: f64) -> bool {
        self.with_current(|prng| prng.with_probability(p))
    }
    fn set_seed(&self, _seed: &[u8]) -> Result<(), Error> {
        Ok(())
    }
    fn seed(&self) -> Result<Vec<u8>, Error> {
        self.with_current(|p| p.seed())
    }
    fn entropy_bits(&self) -> i64 {
        self.with_current(|p| p.entropy_bits())
    }
    fn new_seed_length(&self) -> usize {
        self.with_current(|p| p.new_seed_length())
    }
    fn reseed_failed(&self) -> bool {
        self.with_current(|p| p.reseed_failed())
    }
    fn dump(&self) -> String {
        self.with_current(|p| p.dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rngs::cellular_automaton::CellularAutomatonPrng;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn lazily_created_per_thread() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let trng = ThreadLocalPrng::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Arc::new(CellularAutomatonPrng::from_seed_bytes(&[0, 0, 0, 0]).unwrap())
        });
        let _ = trng.next_u32();
        let _ = trng.next_u32();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_seed_is_a_no_op() {
        let trng = ThreadLocalPrng::new(|| {
            Arc::new(CellularAutomatonPrng::from_seed_bytes(&[1, 2, 3, 4]).unwrap())
        });
        assert!(trng.set_seed(&[9, 9, 9, 9]).is_ok());
    }
}
