// Copyright 2018-2023 Developers of the Rand project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Concrete PRNG algorithms and the composition layers built on top of
//! [`crate::core_prng::BasePrng`].

pub mod cellular_automaton;
pub mod cipher_counter;
pub mod splittable;
pub mod wrapper;

#[cfg(feature = "std")]
pub mod entropy_blocking;
#[cfg(feature = "std")]
pub mod reseeding_thread_local;
#[cfg(feature = "std")]
pub mod thread_local;

pub use cellular_automaton::CellularAutomatonPrng;
pub use cipher_counter::{AesCounterPrng, ChaChaCounterPrng};
pub use splittable::{ReseedingSplittablePrng, SplittablePrng};
pub use wrapper::{Foreign, ForeignRng, RandomWrapper};

#[cfg(feature = "std")]
pub use entropy_blocking::EntropyBlockingPrng;
#[cfg(feature = "std")]
pub use reseeding_thread_local::ReseedingThreadLocalPrng;
#[cfg(feature = "std")]
pub use thread_local::ThreadLocalPrng;
