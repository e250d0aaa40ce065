// Copyright 2018-2023 Developers of the Rand project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reseedable, entropy-accounting pseudo-random number generators.
//!
//! This crate splits every PRNG into two halves, the same way `rand_core`
//! splits [`rand_core::RngCore`] from `rand::Rng`:
//!
//! - [`PrngCore`](core_prng::PrngCore) — algorithm-specific bit production
//!   and seeding, implemented once per algorithm in [`rngs`].
//! - [`Prng`](core_prng::Prng) — the public surface every algorithm shares,
//!   implemented once, generically, by [`core_prng::BasePrng`]: entropy
//!   accounting, bounded sampling, Gaussian sampling, and (with the `std`
//!   feature) background reseeding.
//!
//! Concrete generators:
//!
//! - [`rngs::AesCounterPrng`] / [`rngs::ChaChaCounterPrng`] — cipher-in-
//!   counter-mode generators.
//! - [`rngs::CellularAutomatonPrng`] — a 2056-cell cellular automaton.
//! - [`rngs::SplittablePrng`] / [`rngs::ReseedingSplittablePrng`] — a
//!   SplittableRandom-style linear generator.
//! - [`rngs::RandomWrapper`] — adapts any foreign [`rand_core::RngCore`].
//!
//! With the `std` feature, [`reseeder::ReseederLoop`] runs a background
//! worker that reseeds registered PRNGs from a shared [`seed_source::SeedSource`]
//! when their entropy counter crosses zero, and [`rngs::ThreadLocalPrng`] /
//! [`rngs::ReseedingThreadLocalPrng`] / [`rngs::EntropyBlockingPrng`] compose
//! that with per-thread and strict-accounting policies.
//!
//! ```
//! use better_random::core_prng::Prng;
//! use better_random::rngs::AesCounterPrng;
//!
//! let rng = AesCounterPrng::from_seed_bytes(&[0u8; 16]).unwrap();
//! let _first_u32 = rng.next_u32();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod core_prng;
pub mod error;
pub mod mock;
pub mod rngs;
pub mod seed_source;

#[cfg(feature = "std")]
pub mod reseeder;

pub use core_prng::{next_element, next_enum, Prng, PrngCore};
pub use error::{Error, Result};
pub use seed_source::SeedSource;

#[cfg(feature = "std")]
pub use reseeder::{Priority, ReseederLoop};
