// Copyright 2018-2023 Developers of the Rand project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An adapter around a 64-bit splittable linear generator, the
//! platform-equivalent of `java.util.SplittableRandom`.
//!
//! [`SplittableCore`] is the single-thread variant: one `(seed, gamma)`
//! pair advanced by repeated Weil-sequence addition and a 64-bit mixer.
//! [`ReseedingSplittableCore`] composes the same generator differently: a
//! root generator is never drawn from directly; instead every output
//! call takes a fresh split descendant of the root and draws from that
//! descendant alone. A foreign splittable generator re-installed from a
//! serialized seed (the scenario the original source guarded against by
//! reaching into its private fields) would otherwise replay the same
//! output it had already produced; splitting per call means the root's
//! internal state still advances every time even though each descendant
//! is used exactly once, so the same seed bytes reinstalled later cannot
//! rewind the sequence already observed.

extern crate alloc;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::core_prng::{PrngCore, PrngHandle};
use crate::error::{Error, SeedLengthRange};
use crate::seed_source::SeedSource;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 33)).wrapping_mul(0xff51_afd7_ed55_8ccd);
    z = (z ^ (z >> 33)).wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    z ^ (z >> 33)
}

fn mix_gamma(z: u64) -> u64 {
    let mut z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z = (z ^ (z >> 31)) | 1;
    // Reject gammas with too few set bit-transitions: keeps the
    // increment's Weyl sequence from degenerating to a short period.
    let n = (z ^ (z >> 1)).count_ones();
    if n < 24 {
        z ^ 0xaaaa_aaaa_aaaa_aaaa
    } else {
        z
    }
}

/// A single-thread splittable generator: one seed/gamma pair.
pub struct SplittableCore {
    seed: u64,
    gamma: u64,
    seed_bytes: Vec<u8>,
}

impl SplittableCore {
    /// Build directly from a validated 8-byte seed.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut core = SplittableCore { seed: 0, gamma: GOLDEN_GAMMA, seed_bytes: Vec::new() };
        core.reseed(seed);
        core
    }

    fn next_u64_raw(&mut self) -> u64 {
        self.seed = self.seed.wrapping_add(self.gamma);
        mix64(self.seed)
    }

    /// Derive an independent descendant generator, advancing `self` in
    /// the process so the same descendant is never produced twice.
    pub fn split(&mut self) -> SplittableCore {
        self.seed = self.seed.wrapping_add(self.gamma);
        let child_seed = mix64(self.seed);
        self.seed = self.seed.wrapping_add(self.gamma);
        let child_gamma = mix_gamma(self.seed);
        SplittableCore {
            seed: child_seed,
            gamma: child_gamma,
            seed_bytes: child_seed.to_le_bytes().to_vec(),
        }
    }
}

impl Drop for SplittableCore {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.seed.zeroize();
        self.gamma.zeroize();
        self.seed_bytes.zeroize();
    }
}

impl PrngCore for SplittableCore {
    fn next_bits(&mut self, k: u32) -> u32 {
        debug_assert!((1..=32).contains(&k));
        let v = self.next_u64_raw();
        ((v >> 32) as u32) >> (32 - k)
    }

    fn accepted_seed_lengths(&self) -> SeedLengthRange {
        SeedLengthRange::exact(8)
    }

    fn reseed(&mut self, seed: &[u8]) {
        use zeroize::Zeroize;
        debug_assert_eq!(seed.len(), 8);
        self.seed.zeroize();
        self.seed_bytes.zeroize();
        self.seed = u64::from_le_bytes(seed.try_into().unwrap());
        self.gamma = GOLDEN_GAMMA;
        self.seed_bytes = seed.to_vec();
    }

    fn seed_bytes(&self) -> Vec<u8> {
        self.seed_bytes.clone()
    }

    fn algorithm_name(&self) -> &'static str {
        "SplittableAdapter"
    }

    fn dump_fields(&self) -> String {
        format!("gamma: {:#x}", self.gamma)
    }
}

/// The reseeding variant: every output call draws from a fresh, one-shot
/// split descendant of a root generator instead of the root itself.
pub struct ReseedingSplittableCore {
    root: SplittableCore,
    seed_bytes: Vec<u8>,
}

impl ReseedingSplittableCore {
    /// Build directly from a validated 8-byte seed.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut core = ReseedingSplittableCore {
            root: SplittableCore::from_seed(&[0u8; 8]),
            seed_bytes: Vec::new(),
        };
        core.reseed(seed);
        core
    }
}

impl PrngCore for ReseedingSplittableCore {
    fn next_bits(&mut self, k: u32) -> u32 {
        let mut descendant = self.root.split();
        descendant.next_bits(k)
    }

    fn accepted_seed_lengths(&self) -> SeedLengthRange {
        SeedLengthRange::exact(8)
    }

    fn reseed(&mut self, seed: &[u8]) {
        self.root = SplittableCore::from_seed(seed);
        self.seed_bytes = seed.to_vec();
    }

    fn seed_bytes(&self) -> Vec<u8> {
        self.seed_bytes.clone()
    }

    fn algorithm_name(&self) -> &'static str {
        "ReseedingSplittableAdapter"
    }

    fn dump_fields(&self) -> String {
        format!("root_gamma: {:#x}", self.root.gamma)
    }
}

/// A single-thread splittable-generator adapter.
pub type SplittablePrng = PrngHandle<SplittableCore>;
/// The per-call, split-descendant variant of [`SplittablePrng`].
pub type ReseedingSplittablePrng = PrngHandle<ReseedingSplittableCore>;

fn validate_seed(seed: &[u8]) -> Result<(), Error> {
    let range = SeedLengthRange::exact(8);
    if range.contains(seed.len()) {
        Ok(())
    } else {
        Err(Error::InvalidSeedLength { accepted: range, actual: seed.len() })
    }
}

macro_rules! splittable_constructors {
    ($ty:ident, $core:ty) => {
        impl $ty {
            /// Construct from a raw 8-byte seed.
            pub fn from_seed_bytes(seed: &[u8]) -> Result<Self, Error> {
                validate_seed(seed)?;
                Ok(PrngHandle::from_core(<$core>::from_seed(seed)))
            }

            /// Construct by drawing 8 bytes from `source`.
            pub fn from_seed_source(source: &dyn SeedSource) -> Result<Self, Error> {
                let bytes = source.generate(8)?;
                Self::from_seed_bytes(&bytes)
            }

            /// Construct from the platform cryptographic seed source.
            #[cfg(feature = "os_seed")]
            pub fn from_entropy() -> Result<Self, Error> {
                Self::from_seed_source(&crate::seed_source::OsSeedSource)
            }
        }
    };
}

splittable_constructors!(SplittablePrng, SplittableCore);
splittable_constructors!(ReseedingSplittablePrng, ReseedingSplittableCore);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_prng::Prng;

    #[test]
    fn reproducibility() {
        let seed = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let a = SplittablePrng::from_seed_bytes(&seed).unwrap();
        let b = SplittablePrng::from_seed_bytes(&seed).unwrap();
        let mut out_a = [0u8; 1024];
        let mut out_b = [0u8; 1024];
        a.next_bytes(&mut out_a);
        b.next_bytes(&mut out_b);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn reseeding_reproducibility() {
        let seed = [9u8; 8];
        let a = ReseedingSplittablePrng::from_seed_bytes(&seed).unwrap();
        let b = ReseedingSplittablePrng::from_seed_bytes(&seed).unwrap();
        for _ in 0..256 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn seed_round_trip() {
        let seed = [3u8; 8];
        let p = SplittablePrng::from_seed_bytes(&seed).unwrap();
        assert_eq!(p.seed().unwrap(), seed);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(SplittablePrng::from_seed_bytes(&[0u8; 4]).is_err());
    }

    #[test]
    fn entropy_monotonicity() {
        let p = SplittablePrng::from_seed_bytes(&[0u8; 8]).unwrap();
        let before = p.entropy_bits();
        p.next_u32();
        assert_eq!(p.entropy_bits(), before - 32);
    }
}
