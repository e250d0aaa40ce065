// Copyright 2018 Developers of the Rand project.
// Copyright 2013 The Rust Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The entropy-accounting PRNG contract (`PrngCore` + `BasePrng`).
//!
//! Every concrete algorithm in this crate implements the small
//! [`PrngCore`] trait (algorithm-specific bit production and seeding); the
//! public, entropy-accounted surface used by applications is provided once,
//! generically, by [`BasePrng`] and the [`Prng`] trait it implements. This
//! mirrors the split between `rand_core::RngCore` (what an algorithm must
//! provide) and `rand::Rng` (the blanket convenience surface), except here
//! the blanket surface also tracks how much entropy remains.
//!
//! Each public output method debits a *fixed, documented* number of bits
//! regardless of how many bits the algorithm actually consumed internally
//! (rejection loops and the Gaussian method's warm-up draws are not
//! separately charged) — this is a conservative accounting policy, not a
//! measurement of true consumption.

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "alloc")]
use alloc::{format, string::String, sync::Arc, sync::Weak, vec::Vec};

use core::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
#[cfg(feature = "std")]
use std::sync::Mutex;

use crate::error::{Error, SeedLengthRange};
#[cfg(feature = "std")]
use crate::reseeder::{ReseedTarget, ReseederLoop};

/// Algorithm-specific half of a PRNG: bit production and seeding.
///
/// Implementors do not track entropy or locking; [`BasePrng`] adds both.
pub trait PrngCore: Send {
    /// Returns `k` pseudo-random bits (`1 <= k <= 32`), right-aligned in the
    /// low bits of the result, uniformly distributed. Does not itself debit
    /// entropy; [`BasePrng`] charges the caller.
    fn next_bits(&mut self, k: u32) -> u32;

    /// The seed lengths this algorithm currently accepts via [`Self::reseed`].
    fn accepted_seed_lengths(&self) -> SeedLengthRange;

    /// Replace all state derived from the seed. `seed.len()` is guaranteed
    /// to satisfy [`Self::accepted_seed_lengths`] before this is called.
    fn reseed(&mut self, seed: &[u8]);

    /// A defensive copy of the seed bytes last passed to [`Self::reseed`].
    fn seed_bytes(&self) -> Vec<u8>;

    /// Bits of entropy a seed of `seed_len` bytes is worth for this
    /// algorithm, before the `min(.., maxAcceptableSeed)` clamp applied by
    /// [`BasePrng`]. Most algorithms simply return `seed_len * 8`.
    fn seed_entropy_bits(&self, seed_len: usize) -> i64 {
        (seed_len as i64) * 8
    }

    /// Whether [`Self::seed_bytes`] currently reflects a usable seed.
    ///
    /// Always `true` except for [`crate::rngs::wrapper::RandomWrapperCore`]
    /// instances built around a foreign generator whose seed was never
    /// supplied.
    fn known_seed(&self) -> bool {
        true
    }

    /// Algorithm name, used in [`BasePrng::dump`].
    fn algorithm_name(&self) -> &'static str;

    /// Subclass-specific fields rendered into [`BasePrng::dump`]; no
    /// particular format is guaranteed, this is debug-only.
    fn dump_fields(&self) -> String {
        String::new()
    }
}

/// The full public surface every concrete PRNG in this crate exposes.
///
/// This trait is object-safe so that [`crate::rngs::ThreadLocalPrng`] and
/// [`crate::rngs::RandomWrapper`] can hold a `dyn Prng`.
pub trait Prng: Send + Sync {
    /// Fill `out` with random bytes; debits `8 * out.len()` bits.
    fn next_bytes(&self, out: &mut [u8]);

    /// A uniform random `u32`; debits 32 bits.
    fn next_u32(&self) -> u32;

    /// A uniform random value in `[0, bound)`; debits `ceil(log2(bound))` bits.
    ///
    /// Panics if `bound == 0`.
    fn next_u32_bound(&self, bound: u32) -> u32;

    /// A uniform random value in `[origin, bound)`.
    fn next_i32_range(&self, origin: i32, bound: i32) -> Result<i32, Error>;

    /// A uniform random `u64`; debits 64 bits.
    fn next_u64(&self) -> u64;

    /// A uniform random value in `[0, bound)`.
    fn next_u64_bound(&self, bound: u64) -> u64;

    /// A uniform random value in `[origin, bound)`.
    fn next_i64_range(&self, origin: i64, bound: i64) -> Result<i64, Error>;

    /// A uniform random `bool`; debits 1 bit.
    fn next_bool(&self) -> bool;

    /// A uniform random `f32` in `[0, 1)`; debits 24 bits.
    fn next_f32(&self) -> f32;

    /// A uniform random `f64` in `[0, 1)`; debits 53 bits.
    fn next_f64(&self) -> f64;

    /// A standard-normal sample via the Marsaglia polar method; debits 53
    /// bits (an upper bound; actual consumption varies with rejections but
    /// is not separately charged, by design).
    fn next_gaussian(&self) -> f64;

    /// Returns `true` with probability `p`. Short-circuits without a debit
    /// when `p <= 0.0` or `p >= 1.0`; otherwise debits exactly 1 bit.
    fn with_probability(&self, p: f64) -> bool;

    /// Replaces the seed and all derived state; raises `entropy_bits` to
    /// `min(seed.len(), max_accepted) * 8`, clamped not to decrease.
    fn set_seed(&self, seed: &[u8]) -> Result<(), Error>;

    /// A defensive copy of the seed last set.
    ///
    /// Fails with [`Error::UnsupportedOperation`] only for
    /// [`crate::rngs::wrapper::RandomWrapper`] instances built around a
    /// foreign generator whose seed is not known.
    fn seed(&self) -> Result<Vec<u8>, Error>;

    /// The current entropy counter, in bits. May be zero or negative.
    fn entropy_bits(&self) -> i64;

    /// The seed length this PRNG currently expects (`getNewSeedLength`).
    fn new_seed_length(&self) -> usize;

    /// Whether the most recent background reseed attempt for this PRNG
    /// failed (and was not subsequently retried successfully).
    fn reseed_failed(&self) -> bool;

    /// A debug string: class, hex-encoded seed, entropy count, and
    /// subclass fields. Format is not guaranteed.
    fn dump(&self) -> String;
}

/// A [`Prng`] that also knows how to register itself with a
/// [`ReseederLoop`], used by [`crate::rngs::reseeding_thread_local::ReseedingThreadLocalPrng`]
/// to register whatever concrete generator a per-thread supplier
/// produces without knowing its algorithm.
#[cfg(feature = "std")]
pub trait RegistrablePrng: Prng {
    /// See [`BasePrng::register_with_reseeder`].
    fn register_with(&self, loop_: &Arc<ReseederLoop>);
}

#[cfg(feature = "std")]
impl<C: PrngCore + 'static> RegistrablePrng for PrngHandle<C> {
    fn register_with(&self, loop_: &Arc<ReseederLoop>) {
        self.register_with_reseeder(Some(loop_));
    }
}

/// Uniformly select one element of `items` using `prng`.
///
/// Debits one `next_u32_bound(len)`. Panics if `items` is empty.
pub fn next_element<'a, T>(prng: &dyn Prng, items: &'a [T]) -> &'a T {
    assert!(!items.is_empty(), "next_element: empty slice");
    &items[prng.next_u32_bound(items.len() as u32) as usize]
}

/// Uniformly select one of `variants` (e.g. a fixed enum's `ALL` array).
/// Debits identically to [`next_element`].
pub fn next_enum<'a, T: Copy>(prng: &dyn Prng, variants: &'a [T]) -> T {
    *next_element(prng, variants)
}

const GAUSSIAN_EMPTY: u64 = 0x7ff8_0000_0000_0000; // a canonical NaN pattern

/// The entropy-accounted wrapper shared by every concrete PRNG.
///
/// `C` supplies the algorithm; `BasePrng<C>` supplies locking, entropy
/// accounting, the cached-Gaussian slot, and (with the `std` feature) the
/// reseeder backlink.
pub struct BasePrng<C: PrngCore> {
    #[cfg(feature = "std")]
    core: Mutex<C>,
    #[cfg(not(feature = "std"))]
    core: core::cell::UnsafeCell<C>,
    entropy: AtomicI64,
    gaussian: AtomicU64,
    /// The seed length currently in effect (the length last passed to
    /// `reseed`, not the algorithm's maximum acceptable length). This is
    /// what a background reseed should request, so that e.g. an
    /// `AesCounterPrng` seeded with a 16-byte (AES-128) seed keeps getting
    /// 16-byte reseeds instead of being silently upgraded to AES-256.
    current_seed_len: AtomicUsize,
    #[cfg(feature = "std")]
    reseeder_link: Mutex<Option<Arc<ReseederLoop>>>,
    #[cfg(feature = "std")]
    pending_reseed: AtomicBool,
    reseed_failed: AtomicBool,
    #[cfg(feature = "std")]
    self_weak: Mutex<Option<Weak<BasePrng<C>>>>,
}

// Safety: the only non-atomic, non-mutex-guarded field is `core`'s
// `UnsafeCell` variant used under `no_std`. `no_std` builds never expose
// shared access to a `BasePrng` across threads (the thread-local and
// reseeder machinery that would do so require `std`), so this impl only
// licenses single-threaded-but-generic use, matching how e.g. `Cell<T>`
// is `!Sync` yet plain `UnsafeCell` wrappers used this way are common in
// `no_std` crates that accept the caller enforces exclusivity.
#[cfg(not(feature = "std"))]
unsafe impl<C: PrngCore> Sync for BasePrng<C> {}

impl<C: PrngCore + 'static> BasePrng<C> {
    /// Construct from an already-seeded core.
    pub fn new(core: C) -> Arc<Self> {
        let seed_len = core.seed_bytes().len();
        let entropy = core.seed_entropy_bits(seed_len);
        #[cfg(feature = "std")]
        {
            Arc::new_cyclic(|weak| BasePrng {
                core: Mutex::new(core),
                entropy: AtomicI64::new(entropy),
                gaussian: AtomicU64::new(GAUSSIAN_EMPTY),
                current_seed_len: AtomicUsize::new(seed_len),
                reseeder_link: Mutex::new(None),
                pending_reseed: AtomicBool::new(false),
                reseed_failed: AtomicBool::new(false),
                self_weak: Mutex::new(Some(weak.clone())),
            })
        }
        #[cfg(not(feature = "std"))]
        {
            Arc::new(BasePrng {
                core: core::cell::UnsafeCell::new(core),
                entropy: AtomicI64::new(entropy),
                gaussian: AtomicU64::new(GAUSSIAN_EMPTY),
                current_seed_len: AtomicUsize::new(seed_len),
                reseed_failed: AtomicBool::new(false),
            })
        }
    }

    #[cfg(feature = "std")]
    fn lock(&self) -> std::sync::MutexGuard<'_, C> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(not(feature = "std"))]
    #[allow(clippy::mut_from_ref)]
    fn lock(&self) -> &mut C {
        unsafe { &mut *self.core.get() }
    }

    /// Raw, non-debiting bit production (internal use only).
    fn raw_bits(&self, k: u32) -> u32 {
        self.lock().next_bits(k)
    }

    /// Raw `bits`-wide unsigned value (`bits` in `1..=64`), no debit.
    fn raw_wide(&self, bits: u32) -> u64 {
        if bits <= 32 {
            self.raw_bits(bits) as u64
        } else {
            let hi = self.raw_bits(bits - 32) as u64;
            let lo = self.raw_bits(32) as u64;
            (hi << 32) | lo
        }
    }

    /// Raw `f64` in `[0, 1)` from 53 bits, no debit.
    fn raw_f64(&self) -> f64 {
        let hi = self.raw_bits(26) as u64;
        let lo = self.raw_bits(27) as u64;
        (((hi << 27) | lo) as f64) * (1.0 / (1u64 << 53) as f64)
    }

    fn debit(&self, bits: i64) {
        let post = self.entropy.fetch_sub(bits, Ordering::AcqRel) - bits;
        if post <= 0 {
            self.signal_reseed();
        }
    }

    #[cfg(feature = "std")]
    fn signal_reseed(&self) {
        if self.pending_reseed.swap(true, Ordering::AcqRel) {
            return; // already pending; idempotent per spec
        }
        let loop_ = self.reseeder_link.lock().unwrap().clone();
        match loop_ {
            Some(loop_) => {
                let weak_self = self.self_weak.lock().unwrap().clone();
                if let Some(weak_self) = weak_self {
                    loop_.request_reseed(weak_self as Weak<dyn ReseedTarget>);
                } else {
                    self.pending_reseed.store(false, Ordering::Release);
                }
            }
            None => self.pending_reseed.store(false, Ordering::Release),
        }
    }

    #[cfg(not(feature = "std"))]
    fn signal_reseed(&self) {}

    /// Register (or clear, with `None`) the reseeder this PRNG notifies
    /// when its entropy crosses zero. Replacing an existing registration
    /// deregisters the previous loop.
    #[cfg(feature = "std")]
    pub fn register_with_reseeder(&self, loop_: Option<&Arc<ReseederLoop>>) {
        let mut link = self.reseeder_link.lock().unwrap();
        *link = loop_.cloned();
        if let Some(loop_) = loop_ {
            if let Some(weak_self) = self.self_weak.lock().unwrap().clone() {
                loop_.track_registration(weak_self as Weak<dyn ReseedTarget>);
            }
        }
    }

}

/// Bits needed to reject-sample a uniform value in `[0, range)`.
pub(crate) fn bits_for_range(range: u64) -> u32 {
    debug_assert!(range > 0);
    (64 - (range - 1).leading_zeros()).max(1).min(64)
}

impl<C: PrngCore + 'static> Prng for BasePrng<C> {
    fn next_bytes(&self, out: &mut [u8]) {
        let mut i = 0;
        while i < out.len() {
            let word = self.raw_bits(32);
            let take = (out.len() - i).min(4);
            out[i..i + take].copy_from_slice(&word.to_be_bytes()[..take]);
            i += take;
        }
        self.debit(8 * out.len() as i64);
    }

    fn next_u32(&self) -> u32 {
        let v = self.raw_bits(32);
        self.debit(32);
        v
    }

    fn next_u32_bound(&self, bound: u32) -> u32 {
        assert!(bound > 0, "next_u32_bound: bound must be > 0");
        let bits = bits_for_range(bound as u64).min(32);
        self.debit(bits as i64);
        loop {
            let v = self.raw_bits(bits);
            if v < bound {
                return v;
            }
        }
    }

    fn next_i32_range(&self, origin: i32, bound: i32) -> Result<i32, Error> {
        if bound <= origin {
            return Err(Error::InvalidBound { origin: origin as i64, bound: bound as i64 });
        }
        let range = bound as i64 - origin as i64;
        if range <= u32::MAX as i64 {
            return Ok(origin + self.next_u32_bound(range as u32) as i32);
        }
        // range overflows i32: sample a full 32-bit integer and reject.
        self.debit(32);
        loop {
            let v = self.raw_bits(32) as i32;
            if v >= origin && v < bound {
                return Ok(v);
            }
        }
    }

    fn next_u64(&self) -> u64 {
        let v = self.raw_wide(64);
        self.debit(64);
        v
    }

    fn next_u64_bound(&self, bound: u64) -> u64 {
        assert!(bound > 0, "next_u64_bound: bound must be > 0");
        let bits = bits_for_range(bound);
        self.debit(bits as i64);
        loop {
            let v = self.raw_wide(bits);
            if v < bound {
                return v;
            }
        }
    }

    fn next_i64_range(&self, origin: i64, bound: i64) -> Result<i64, Error> {
        if bound <= origin {
            return Err(Error::InvalidBound { origin, bound });
        }
        match (bound as i128).checked_sub(origin as i128) {
            Some(range) if range > 0 && range <= u64::MAX as i128 => {
                Ok(origin + self.next_u64_bound(range as u64) as i64)
            }
            _ => {
                self.debit(64);
                loop {
                    let v = self.raw_wide(64) as i64;
                    if v >= origin && v < bound {
                        return Ok(v);
                    }
                }
            }
        }
    }

    fn next_bool(&self) -> bool {
        let v = self.raw_bits(1);
        self.debit(1);
        v != 0
    }

    fn next_f32(&self) -> f32 {
        let v = self.raw_bits(24);
        self.debit(24);
        (v as f32) * (1.0 / (1u32 << 24) as f32)
    }

    fn next_f64(&self) -> f64 {
        let v = self.raw_f64();
        self.debit(53);
        v
    }

    fn next_gaussian(&self) -> f64 {
        let taken = self.gaussian.swap(GAUSSIAN_EMPTY, Ordering::AcqRel);
        let cached = f64::from_bits(taken);
        self.debit(53);
        if !cached.is_nan() {
            return cached;
        }
        loop {
            let v1 = 2.0 * self.raw_f64() - 1.0;
            let v2 = 2.0 * self.raw_f64() - 1.0;
            let s = v1 * v1 + v2 * v2;
            if s > 0.0 && s < 1.0 {
                let m = (-2.0 * s.ln() / s).sqrt();
                self.gaussian.store((v2 * m).to_bits(), Ordering::Release);
                return v1 * m;
            }
        }
    }

    fn with_probability(&self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        let v = self.raw_f64();
        self.debit(1);
        v < p
    }

    fn set_seed(&self, seed: &[u8]) -> Result<(), Error> {
        let accepted = self.lock().accepted_seed_lengths();
        if !accepted.contains(seed.len()) {
            return Err(Error::InvalidSeedLength { accepted, actual: seed.len() });
        }
        let new_entropy = {
            let mut guard = self.lock();
            guard.reseed(seed);
            guard.seed_entropy_bits(seed.len())
        };
        let mut cur = self.entropy.load(Ordering::Acquire);
        loop {
            let next = cur.max(new_entropy);
            match self.entropy.compare_exchange_weak(
                cur,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
        self.current_seed_len.store(seed.len(), Ordering::Release);
        #[cfg(feature = "std")]
        self.pending_reseed.store(false, Ordering::Release);
        Ok(())
    }

    fn seed(&self) -> Result<Vec<u8>, Error> {
        let guard = self.lock();
        if guard.known_seed() {
            Ok(guard.seed_bytes())
        } else {
            Err(Error::UnsupportedOperation(
                "seed is not known for this wrapped generator",
            ))
        }
    }

    fn entropy_bits(&self) -> i64 {
        self.entropy.load(Ordering::Acquire)
    }

    fn new_seed_length(&self) -> usize {
        let accepted = self.lock().accepted_seed_lengths();
        let current = self.current_seed_len.load(Ordering::Acquire);
        current.min(accepted.max.unwrap_or(current)).max(accepted.min)
    }

    fn reseed_failed(&self) -> bool {
        self.reseed_failed.load(Ordering::Acquire)
    }

    fn dump(&self) -> String {
        #[cfg(feature = "alloc")]
        {
            let guard = self.lock();
            let seed_hex = crate::error::hex_encode(&guard.seed_bytes());
            let fields = guard.dump_fields();
            if fields.is_empty() {
                format!(
                    "{} {{ seed: {}, entropy_bits: {} }}",
                    guard.algorithm_name(),
                    seed_hex,
                    self.entropy_bits()
                )
            } else {
                format!(
                    "{} {{ seed: {}, entropy_bits: {}, {} }}",
                    guard.algorithm_name(),
                    seed_hex,
                    self.entropy_bits(),
                    fields
                )
            }
        }
        #[cfg(not(feature = "alloc"))]
        {
            String::new()
        }
    }
}

#[cfg(feature = "std")]
impl<C: PrngCore + 'static> ReseedTarget for BasePrng<C> {
    fn new_seed_length(&self) -> usize {
        Prng::new_seed_length(self)
    }

    fn apply_seed(&self, bytes: &[u8]) {
        let _ = Prng::set_seed(self, bytes);
    }

    fn mark_reseed_failed(&self, failed: bool) {
        self.reseed_failed.store(failed, Ordering::Release);
    }

    fn clear_pending(&self) {
        self.pending_reseed.store(false, Ordering::Release);
    }
}

/// A cheaply cloneable handle around an `Arc<BasePrng<C>>`.
///
/// Every concrete PRNG in [`crate::rngs`] is a type alias of `PrngHandle`
/// over its own [`PrngCore`]; this is where the `Prng` trait methods are
/// implemented once and delegated, instead of per algorithm.
pub struct PrngHandle<C: PrngCore + 'static>(pub(crate) Arc<BasePrng<C>>);

impl<C: PrngCore + 'static> Clone for PrngHandle<C> {
    fn clone(&self) -> Self {
        PrngHandle(self.0.clone())
    }
}

impl<C: PrngCore + 'static> PrngHandle<C> {
    /// Wrap an already-seeded core.
    pub fn from_core(core: C) -> Self {
        PrngHandle(BasePrng::new(core))
    }

    /// See [`BasePrng::register_with_reseeder`].
    #[cfg(feature = "std")]
    pub fn register_with_reseeder(&self, loop_: Option<&Arc<ReseederLoop>>) {
        self.0.register_with_reseeder(loop_);
    }
}

impl<C: PrngCore + 'static> core::fmt::Debug for PrngHandle<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&Prng::dump(self))
    }
}

impl<C: PrngCore + 'static> Prng for PrngHandle<C> {
    fn next_bytes(&self, out: &mut [u8]) {
        self.0.next_bytes(out)
    }
    fn next_u32(&self) -> u32 {
        self.0.next_u32()
    }
    fn next_u32_bound(&self, bound: u32) -> u32 {
        self.0.next_u32_bound(bound)
    }
    fn next_i32_range(&self, origin: i32, bound: i32) -> Result<i32, Error> {
        self.0.next_i32_range(origin, bound)
    }
    fn next_u64(&self) -> u64 {
        self.0.next_u64()
    }
    fn next_u64_bound(&self, bound: u64) -> u64 {
        self.0.next_u64_bound(bound)
    }
    fn next_i64_range(&self, origin: i64, bound: i64) -> Result<i64, Error> {
        self.0.next_i64_range(origin, bound)
    }
    fn next_bool(&self) -> bool {
        self.0.next_bool()
    }
    fn next_f32(&self) -> f32 {
        self.0.next_f32()
    }
    fn next_f64(&self) -> f64 {
        self.0.next_f64()
    }
    fn next_gaussian(&self) -> f64 {
        self.0.next_gaussian()
    }
    fn with_probability(&self, p: f64) -> bool {
        self.0.with_probability(p)
    }
    fn set_seed(&self, seed: &[u8]) -> Result<(), Error> {
        self.0.set_seed(seed)
    }
    fn seed(&self) -> Result<Vec<u8>, Error> {
        self.0.seed()
    }
    fn entropy_bits(&self) -> i64 {
        self.0.entropy_bits()
    }
    fn new_seed_length(&self) -> usize {
        Prng::new_seed_length(&*self.0)
    }
    fn reseed_failed(&self) -> bool {
        self.0.reseed_failed()
    }
    fn dump(&self) -> String {
        self.0.dump()
    }
}
