// Copyright 2018 Developers of the Rand project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sources of fresh random bytes used to seed and reseed PRNGs.

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::error::{Error, SeedErrorKind};

/// A source of random bytes used for seeding and reseeding.
///
/// This is the crate's only required external collaborator: everything else
/// (the cipher cores, the cellular automaton, the reseeder) is built on top
/// of `generate`. Implementations must be safe to call concurrently from
/// multiple threads; the reseeder never holds a PRNG's lock while calling
/// into one.
pub trait SeedSource: Send + Sync {
    /// Produce exactly `length` random bytes, or fail.
    ///
    /// Implementations that can only produce fewer bytes than requested must
    /// fail with [`Error::Seed`] rather than return a short buffer.
    fn generate(&self, length: usize) -> Result<Vec<u8>, Error>;
}

impl<S: SeedSource + ?Sized> SeedSource for &S {
    fn generate(&self, length: usize) -> Result<Vec<u8>, Error> {
        (**self).generate(length)
    }
}

#[cfg(feature = "alloc")]
impl<S: SeedSource + ?Sized> SeedSource for alloc::sync::Arc<S> {
    fn generate(&self, length: usize) -> Result<Vec<u8>, Error> {
        (**self).generate(length)
    }
}

/// The platform cryptographic random source (`getrandom`, via `rand_core`'s
/// `OsRng`).
///
/// This is the default [`SeedSource`] used when a concrete PRNG or
/// [`crate::ReseederLoop`] is constructed without one being supplied
/// explicitly.
#[cfg(feature = "os_seed")]
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSeedSource;

#[cfg(feature = "os_seed")]
impl SeedSource for OsSeedSource {
    fn generate(&self, length: usize) -> Result<Vec<u8>, Error> {
        use rand_core::{OsRng, TryRngCore};
        let mut buf = alloc::vec![0u8; length];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| Error::Seed(SeedErrorKind::Unavailable, seed_err_msg(e)))?;
        Ok(buf)
    }
}

#[cfg(feature = "os_seed")]
fn seed_err_msg(_e: rand_core::OsError) -> &'static str {
    "platform cryptographic random source failed"
}

/// A fixed-output seed source, useful for deterministic tests: it always
/// returns bytes drawn (with wraparound) from a fixed buffer.
#[derive(Debug, Clone)]
pub struct FixedSeedSource {
    bytes: Vec<u8>,
}

impl FixedSeedSource {
    /// Build a source that cycles through `bytes` forever.
    pub fn new(bytes: Vec<u8>) -> Self {
        assert!(!bytes.is_empty(), "FixedSeedSource needs at least one byte");
        FixedSeedSource { bytes }
    }
}

impl SeedSource for FixedSeedSource {
    fn generate(&self, length: usize) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(length);
        let mut it = self.bytes.iter().cycle();
        for _ in 0..length {
            out.push(*it.next().unwrap());
        }
        Ok(out)
    }
}

/// A [`SeedSource`] that always fails, for exercising reseed-failure paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSeedSource;

impl SeedSource for FailingSeedSource {
    fn generate(&self, _length: usize) -> Result<Vec<u8>, Error> {
        Err(Error::Seed(SeedErrorKind::Unavailable, "seed source deliberately fails"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_seed_source_cycles() {
        let src = FixedSeedSource::new(vec![1, 2, 3]);
        let out = src.generate(7).unwrap();
        assert_eq!(out, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn failing_seed_source_fails() {
        assert!(FailingSeedSource.generate(4).is_err());
    }
}
