// Copyright 2018-2023 Developers of the Rand project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Adapts a foreign [`rand_core::RngCore`] generator into the
//! entropy-accounted [`crate::core_prng::Prng`] contract.
//!
//! Unlike the algorithms in [`crate::rngs::cipher_counter`] and
//! [`crate::rngs::cellular_automaton`], the wrapped generator is opaque:
//! this crate does not know how to re-seed it unless the caller says how,
//! via [`ForeignRng::seed_kind`]. [`Foreign`] is the degenerate case (no
//! known seeding path at all), matching a foreign instance handed to us
//! with no further information.

extern crate alloc;
use alloc::vec::Vec;

use rand_core::RngCore;

use crate::core_prng::{PrngCore, PrngHandle};
use crate::error::SeedLengthRange;

/// How a wrapped generator accepts a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    /// Exposes a byte-array seed API and does not prefer a long seed:
    /// seed bytes are forwarded unchanged.
    Bytes,
    /// Exposes only a single 64-bit seed; the caller must supply exactly
    /// 8 bytes, forwarded as a little-endian `u64`.
    LongOnly,
    /// A "secure" PRNG accepting an arbitrary-length additive byte seed,
    /// forwarded unchanged (same forwarding as `Bytes`, kept distinct to
    /// document the generator's own semantics).
    AdditiveBytes,
    /// No known seeding path; `set_seed` always fails and `seed()` is
    /// [`crate::error::Error::UnsupportedOperation`] until never, since
    /// there is no way to supply one.
    Unknown,
}

/// The extra information [`RandomWrapperCore`] needs beyond
/// [`rand_core::RngCore`] to participate in seeding.
///
/// Implementors that have no seeding story of their own (the common case
/// for a third-party generator wrapped without modification) can rely on
/// the default `Unknown` behaviour and the two no-op setters.
pub trait ForeignRng: RngCore + Send {
    /// See [`SeedKind`]. Defaults to [`SeedKind::Unknown`].
    fn seed_kind(&self) -> SeedKind {
        SeedKind::Unknown
    }

    /// Accepted seed-byte lengths for [`SeedKind::Bytes`] and
    /// [`SeedKind::AdditiveBytes`]. Ignored for the other two kinds.
    fn seed_length_range(&self) -> SeedLengthRange {
        SeedLengthRange::ranged(0, 0)
    }

    /// Install a byte-array seed. Called only when
    /// [`Self::seed_kind`] is [`SeedKind::Bytes`] or
    /// [`SeedKind::AdditiveBytes`].
    fn set_seed_bytes(&mut self, _seed: &[u8]) {}

    /// Install a 64-bit seed. Called only when [`Self::seed_kind`] is
    /// [`SeedKind::LongOnly`].
    fn set_seed_long(&mut self, _seed: u64) {}
}

/// Wraps any [`rand_core::RngCore`] with no further seeding knowledge
/// ([`SeedKind::Unknown`]) — the case of a foreign instance handed to us
/// that we cannot reproduce.
pub struct Foreign<T>(pub T);

impl<T: RngCore + Send> RngCore for Foreign<T> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.0.fill_bytes(dst)
    }
}

impl<T: RngCore + Send> ForeignRng for Foreign<T> {}

/// The generic wrapper core: delegates output to `R` and separately
/// tracks whether the current seed is known.
pub struct RandomWrapperCore<R: ForeignRng> {
    inner: R,
    known_seed: bool,
    seed_bytes: Vec<u8>,
}

impl<R: ForeignRng> RandomWrapperCore<R> {
    /// Wrap `inner` with no seed known yet.
    pub fn wrap(inner: R) -> Self {
        RandomWrapperCore { inner, known_seed: false, seed_bytes: Vec::new() }
    }
}

impl<R: ForeignRng + 'static> PrngCore for RandomWrapperCore<R> {
    fn next_bits(&mut self, k: u32) -> u32 {
        debug_assert!((1..=32).contains(&k));
        self.inner.next_u32() >> (32 - k)
    }

    fn accepted_seed_lengths(&self) -> SeedLengthRange {
        match self.inner.seed_kind() {
            SeedKind::Bytes | SeedKind::AdditiveBytes => self.inner.seed_length_range(),
            SeedKind::LongOnly => SeedLengthRange::exact(8),
            // No length satisfies this range in practice, so `set_seed`
            // always reports `InvalidSeedLength`, per the documented
            // fallback for a generator with no seeding path.
            SeedKind::Unknown => SeedLengthRange::ranged(usize::MAX, usize::MAX),
        }
    }

    fn reseed(&mut self, seed: &[u8]) {
        match self.inner.seed_kind() {
            SeedKind::Bytes | SeedKind::AdditiveBytes => self.inner.set_seed_bytes(seed),
            SeedKind::LongOnly => {
                let v = u64::from_le_bytes(seed.try_into().expect("length checked by caller"));
                self.inner.set_seed_long(v);
            }
            SeedKind::Unknown => unreachable!("accepted_seed_lengths rejects every length"),
        }
        self.seed_bytes = seed.to_vec();
        self.known_seed = true;
    }

    fn seed_bytes(&self) -> Vec<u8> {
        self.seed_bytes.clone()
    }

    fn known_seed(&self) -> bool {
        self.known_seed
    }

    fn algorithm_name(&self) -> &'static str {
        "RandomWrapper"
    }
}

/// A foreign [`rand_core::RngCore`] generator adapted into this crate's
/// entropy-accounted [`crate::core_prng::Prng`] contract.
pub type RandomWrapper<R> = PrngHandle<RandomWrapperCore<R>>;

impl<R: ForeignRng + 'static> RandomWrapper<R> {
    /// Wrap a foreign generator; its seed is unknown until [`crate::core_prng::Prng::set_seed`]
    /// is called.
    pub fn wrap(inner: R) -> Self {
        PrngHandle::from_core(RandomWrapperCore::wrap(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_prng::Prng;

    struct Counter(u32);
    impl RngCore for Counter {
        fn next_u32(&mut self) -> u32 {
            self.0 = self.0.wrapping_add(1);
            self.0
        }
        fn next_u64(&mut self) -> u64 {
            ((self.next_u32() as u64) << 32) | self.next_u32() as u64
        }
        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for chunk in dst.chunks_mut(4) {
                let word = self.next_u32().to_be_bytes();
                chunk.copy_from_slice(&word[..chunk.len()]);
            }
        }
    }

    struct ByteSeeded(Counter);
    impl RngCore for ByteSeeded {
        fn next_u32(&mut self) -> u32 {
            self.0.next_u32()
        }
        fn next_u64(&mut self) -> u64 {
            self.0.next_u64()
        }
        fn fill_bytes(&mut self, dst: &mut [u8]) {
            self.0.fill_bytes(dst)
        }
    }
    impl ForeignRng for ByteSeeded {
        fn seed_kind(&self) -> SeedKind {
            SeedKind::Bytes
        }
        fn seed_length_range(&self) -> SeedLengthRange {
            SeedLengthRange::exact(4)
        }
        fn set_seed_bytes(&mut self, seed: &[u8]) {
            self.0 .0 = u32::from_le_bytes(seed.try_into().unwrap());
        }
    }

    struct LongSeeded(Counter);
    impl RngCore for LongSeeded {
        fn next_u32(&mut self) -> u32 {
            self.0.next_u32()
        }
        fn next_u64(&mut self) -> u64 {
            self.0.next_u64()
        }
        fn fill_bytes(&mut self, dst: &mut [u8]) {
            self.0.fill_bytes(dst)
        }
    }
    impl ForeignRng for LongSeeded {
        fn seed_kind(&self) -> SeedKind {
            SeedKind::LongOnly
        }
        fn set_seed_long(&mut self, seed: u64) {
            self.0 .0 = seed as u32;
        }
    }

    #[test]
    fn unknown_seed_is_unsupported() {
        let w = RandomWrapper::wrap(Foreign(Counter(0)));
        assert!(matches!(w.seed(), Err(crate::error::Error::UnsupportedOperation(_))));
    }

    #[test]
    fn unknown_seed_set_seed_fails() {
        let w = RandomWrapper::wrap(Foreign(Counter(0)));
        assert!(w.set_seed(&[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn byte_seed_round_trips() {
        let w = RandomWrapper::wrap(ByteSeeded(Counter(0)));
        w.set_seed(&[9, 0, 0, 0]).unwrap();
        assert_eq!(w.seed().unwrap(), vec![9, 0, 0, 0]);
        assert_eq!(w.next_u32(), 10);
    }

    #[test]
    fn long_seed_requires_eight_bytes() {
        let w = RandomWrapper::wrap(LongSeeded(Counter(0)));
        assert!(w.set_seed(&[1, 2, 3]).is_err());
        assert!(w.set_seed(&[0u8; 8]).is_ok());
    }

    #[test]
    fn delegates_output() {
        let w = RandomWrapper::wrap(ByteSeeded(Counter(0)));
        assert_eq!(w.next_u32(), 1);
        assert_eq!(w.next_u32(), 2);
    }
}
