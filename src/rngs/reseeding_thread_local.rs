// Copyright 2018-2023 Developers of the Rand project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`ThreadLocalPrng`](crate::rngs::thread_local::ThreadLocalPrng), composed
//! with a [`ReseederLoop`]: the first access on each thread both creates
//! the thread's instance and registers it with the loop, so an
//! entropy-exhausted thread-local PRNG gets reseeded in the background
//! just like any other.
//!
//! Per-thread teardown "deregisters" for free: the registry entry is
//! dropped along with the thread's [`std::thread_local!`] storage, and
//! since the loop only ever held a [`alloc::sync::Weak`] to it (via
//! [`RegistrablePrng::register_with`]), there is nothing further to
//! clean up.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core_prng::{Prng, RegistrablePrng};
use crate::error::Error;
use crate::reseeder::ReseederLoop;

thread_local! {
    static REGISTRY: RefCell<HashMap<u64, Arc<dyn RegistrablePrng>>> = RefCell::new(HashMap::new());
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A per-thread PRNG that registers itself with a [`ReseederLoop`] the
/// first time each thread uses it.
pub struct ReseedingThreadLocalPrng {
    id: u64,
    supplier: Arc<dyn Fn() -> Arc<dyn RegistrablePrng> + Send + Sync>,
    reseeder: Arc<ReseederLoop>,
}

impl ReseedingThreadLocalPrng {
    /// Build a new instance backed by `reseeder`; `supplier` is called at
    /// most once per thread.
    pub fn new<F>(reseeder: Arc<ReseederLoop>, supplier: F) -> Self
    where
        F: Fn() -> Arc<dyn RegistrablePrng> + Send + Sync + 'static,
    {
        ReseedingThreadLocalPrng {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            supplier: Arc::new(supplier),
            reseeder,
        }
    }

    fn with_current<R>(&self, f: impl FnOnce(&Arc<dyn RegistrablePrng>) -> R) -> R {
        REGISTRY.with(|reg| {
            let mut reg = reg.borrow_mut();
            let current = reg.entry(self.id).or_insert_with(|| {
                let prng = (self.supplier)();
                prng.register_with(&self.reseeder);
                prng
            });
            f(current)
        })
    }
}

impl Prng for ReseedingThreadLocalPrng {
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
    use crate::seed_source::FixedSeedSource;

    #[test]
    fn first_access_registers_with_reseeder() {
        let source: Arc<dyn crate::seed_source::SeedSource> =
            Arc::new(FixedSeedSource::new(vec![1, 2, 3, 4]));
        let loop_ = ReseederLoop::new(source);
        let prng = ReseedingThreadLocalPrng::new(loop_.clone(), || {
            Arc::new(CellularAutomatonPrng::from_seed_bytes(&[0, 0, 0, 0]).unwrap())
        });
        let _ = prng.next_u32();
        assert_eq!(loop_.registered_count(), 1);
        loop_.stop();
    }
}
