// Copyright 2018-2023 Developers of the Rand project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A 2056-cell cellular-automaton PRNG.
//!
//! Unlike the cipher-counter cores, this algorithm has no external
//! building block to lean on (no block cipher, no digest): the state is
//! a flat array of cells and a single fixed 512-byte rule table applied
//! to a sliding window of four cells per step. It plays the same role in
//! this crate that `rand_pcg`'s linear-congruential core plays for
//! `rand` — a compact, self-contained, bit-exact generator with its own
//! seeding and stepping rules, wired into the shared entropy-accounting
//! surface the same way [`crate::rngs::cipher_counter::CipherCounterCore`]
//! is.

extern crate alloc;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::core_prng::{PrngCore, PrngHandle};
use crate::error::{Error, SeedLengthRange};
use crate::seed_source::SeedSource;

const NUM_CELLS: usize = 2056;
const PRE_EVOLVE_STEPS: usize = NUM_CELLS * NUM_CELLS / 4;

/// The fixed 512-entry rule table the step function looks up into.
///
/// Indices are taken modulo 512 (`& 0x1FF`); the table is addressed with a
/// 9-bit mask rather than a bounds check because the two seed-derived
/// cells a step sums before the table has had a chance to fold them back
/// into `0..256` can momentarily exceed 255 (see [`CellularAutomatonCore::reseed`]).
const RULE: [u8; 512] = [
    221, 120, 34, 162, 116, 36, 20, 37, 24, 28, 127, 89, 219, 130, 177, 234,
    252, 31, 206, 110, 99, 131, 102, 19, 152, 221, 242, 235, 97, 232, 102, 84,
    47, 230, 20, 179, 248, 23, 209, 73, 202, 52, 114, 224, 175, 10, 16, 251,
    94, 9, 121, 48, 77, 161, 33, 43, 207, 9, 201, 98, 60, 119, 105, 142,
    236, 23, 176, 209, 211, 201, 239, 1, 213, 172, 249, 170, 36, 96, 117, 151,
    24, 61, 124, 17, 27, 156, 247, 80, 169, 150, 234, 96, 155, 65, 39, 31,
    107, 46, 245, 5, 196, 123, 64, 24, 192, 204, 77, 37, 218, 14, 196, 193,
    134, 155, 72, 39, 230, 98, 72, 42, 21, 134, 203, 151, 173, 18, 234, 213,
    79, 144, 146, 160, 251, 167, 195, 240, 156, 8, 77, 176, 186, 174, 236, 50,
    243, 242, 199, 235, 173, 27, 25, 114, 145, 204, 46, 85, 63, 18, 3, 70,
    84, 234, 184, 26, 82, 151, 219, 173, 154, 218, 206, 148, 69, 210, 186, 175,
    9, 136, 66, 175, 38, 35, 190, 148, 129, 5, 189, 163, 139, 30, 109, 156,
    132, 163, 201, 195, 35, 65, 47, 14, 77, 119, 27, 190, 59, 19, 229, 66,
    233, 108, 208, 232, 131, 81, 114, 166, 247, 188, 211, 193, 111, 16, 12, 38,
    81, 179, 237, 10, 21, 123, 225, 154, 201, 133, 206, 193, 72, 38, 255, 136,
    120, 177, 110, 77, 94, 41, 247, 3, 133, 30, 250, 77, 157, 91, 0, 68,
    11, 254, 197, 40, 22, 228, 110, 247, 137, 252, 169, 169, 134, 219, 233, 199,
    153, 196, 209, 144, 247, 52, 65, 83, 72, 96, 215, 254, 36, 90, 77, 205,
    147, 101, 243, 47, 117, 162, 14, 95, 75, 190, 29, 144, 31, 74, 90, 118,
    18, 242, 213, 117, 107, 111, 1, 253, 223, 254, 150, 74, 194, 170, 30, 242,
    219, 217, 79, 59, 93, 47, 195, 215, 195, 246, 129, 193, 63, 220, 93, 118,
    238, 104, 163, 251, 136, 95, 97, 115, 91, 3, 122, 134, 39, 29, 82, 223,
    192, 244, 62, 172, 68, 0, 159, 160, 211, 199, 165, 90, 245, 98, 133, 241,
    142, 60, 17, 140, 141, 112, 245, 225, 122, 240, 45, 208, 104, 197, 182, 164,
    172, 212, 130, 183, 240, 196, 36, 12, 65, 192, 5, 251, 29, 76, 228, 71,
    17, 140, 181, 240, 227, 111, 20, 48, 129, 218, 24, 127, 65, 1, 225, 219,
    109, 185, 36, 245, 114, 38, 110, 177, 247, 223, 83, 250, 128, 42, 34, 7,
    87, 203, 60, 23, 248, 170, 120, 97, 208, 103, 76, 29, 137, 135, 106, 115,
    27, 97, 0, 28, 35, 31, 142, 144, 73, 0, 30, 15, 115, 18, 16, 254,
    120, 117, 25, 51, 243, 75, 218, 214, 148, 111, 157, 114, 84, 237, 127, 13,
    190, 229, 183, 51, 125, 113, 30, 92, 171, 173, 197, 251, 93, 51, 182, 7,
    184, 171, 157, 172, 5, 88, 71, 144, 183, 214, 254, 45, 218, 206, 116, 208,
];

#[inline]
fn rule1(a: i32) -> i32 {
    RULE[(a as usize) & 0x1FF] as i32
}

#[inline]
fn rule2(a: i32, b: i32) -> i32 {
    RULE[((a + b) as usize) & 0x1FF] as i32
}

/// The cellular-automaton algorithmic core: 2056 cells and a cursor.
pub struct CellularAutomatonCore {
    cells: Vec<i32>,
    current_cell_index: usize,
    seed_bytes: Vec<u8>,
}

impl CellularAutomatonCore {
    /// Build directly from a validated 4-byte seed.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut core = CellularAutomatonCore {
            cells: alloc::vec![0i32; NUM_CELLS],
            current_cell_index: NUM_CELLS - 1,
            seed_bytes: Vec::new(),
        };
        core.reseed(seed);
        core
    }

    /// Advance the automaton one step and return the 32-bit word it
    /// produces, right-shifted to `k` bits.
    ///
    /// `currentCellIndex` always lands on an index `== 3 (mod 4)` between
    /// calls (it starts at 2055 and decrements by 4, wrapping to 2055
    /// whenever it would otherwise reach 0), so `c >= 3` always holds and
    /// `c - 1`, `c - 2`, `c - 3` never underflow.
    fn step(&mut self, k: u32) -> u32 {
        let c = self.current_cell_index;
        let b = c - 1;
        let a = c - 2;
        let cells = &mut self.cells;

        cells[c] = rule2(cells[b], cells[c]);
        cells[b] = rule2(cells[a], cells[b]);
        cells[a] = rule2(cells[a - 1], cells[a]);

        if c - 3 == 0 {
            cells[0] = rule1(cells[0]);
            self.current_cell_index = NUM_CELLS - 1;
        } else {
            let c4 = c - 4;
            cells[c - 3] = rule2(cells[c4], cells[c - 3]);
            self.current_cell_index = c4;
        }

        let word = (cells[c - 3] as u32)
            | ((cells[a] as u32) << 8)
            | ((cells[b] as u32) << 16)
            | ((cells[c] as u32) << 24);
        word >> (32 - k)
    }
}

impl PrngCore for CellularAutomatonCore {
    fn next_bits(&mut self, k: u32) -> u32 {
        debug_assert!((1..=32).contains(&k));
        self.step(k)
    }

    fn accepted_seed_lengths(&self) -> SeedLengthRange {
        SeedLengthRange::exact(4)
    }

    fn reseed(&mut self, seed: &[u8]) {
        debug_assert_eq!(seed.len(), 4);
        self.cells[2055] = seed[0] as i32 + 128;
        self.cells[2054] = seed[1] as i32 + 128;
        self.cells[2053] = seed[2] as i32 + 128;
        self.cells[2052] = seed[3] as i32 + 128;

        // Preserved as specified for bit-exact reproducibility with the
        // original generator: S is incremented unless it is already
        // saturated.
        let mut s = u32::from_le_bytes([seed[0], seed[1], seed[2], seed[3]]);
        if s != 0xFFFF_FFFF {
            s = s.wrapping_add(1);
        }
        for (i, cell) in self.cells[..2052].iter_mut().enumerate() {
            *cell = ((s >> (i % 32)) & 0xFF) as i32;
        }

        self.current_cell_index = NUM_CELLS - 1;
        self.seed_bytes = seed.to_vec();

        for _ in 0..PRE_EVOLVE_STEPS {
            self.step(32);
        }
    }

    fn seed_bytes(&self) -> Vec<u8> {
        self.seed_bytes.clone()
    }

    fn algorithm_name(&self) -> &'static str {
        "CellularAutomatonPrng"
    }

    fn dump_fields(&self) -> String {
        format!("current_cell_index: {}", self.current_cell_index)
    }
}

/// A 2056-cell cellular-automaton pseudo-random number generator.
pub type CellularAutomatonPrng = PrngHandle<CellularAutomatonCore>;

fn validate_seed(seed: &[u8]) -> Result<(), Error> {
    let range = SeedLengthRange::exact(4);
    if range.contains(seed.len()) {
        Ok(())
    } else {
        Err(Error::InvalidSeedLength { accepted: range, actual: seed.len() })
    }
}

impl CellularAutomatonPrng {
    /// Construct from a raw 4-byte seed.
    pub fn from_seed_bytes(seed: &[u8]) -> Result<Self, Error> {
        validate_seed(seed)?;
        Ok(PrngHandle::from_core(CellularAutomatonCore::from_seed(seed)))
    }

    /// Construct by drawing 4 bytes from `source`.
    pub fn from_seed_source(source: &dyn SeedSource) -> Result<Self, Error> {
        let bytes = source.generate(4)?;
        Self::from_seed_bytes(&bytes)
    }

    /// Construct from the platform cryptographic seed source.
    #[cfg(feature = "os_seed")]
    pub fn from_entropy() -> Result<Self, Error> {
        Self::from_seed_source(&crate::seed_source::OsSeedSource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_prng::Prng;

    #[test]
    fn zero_seed_golden_vector() {
        let p = CellularAutomatonPrng::from_seed_bytes(&[0, 0, 0, 0]).unwrap();
        let got: Vec<u32> = (0..4).map(|_| p.next_u32()).collect();
        assert_eq!(got, vec![4032824067, 1626377921, 2166953685, 3453999845]);
    }

    #[test]
    fn other_seed_golden_vector() {
        let p = CellularAutomatonPrng::from_seed_bytes(&[1, 2, 3, 4]).unwrap();
        let got: Vec<u32> = (0..4).map(|_| p.next_u32()).collect();
        assert_eq!(got, vec![2781284635, 1374536956, 2856473484, 2751536980]);
    }

    #[test]
    fn reproducibility() {
        let a = CellularAutomatonPrng::from_seed_bytes(&[5, 6, 7, 8]).unwrap();
        let b = CellularAutomatonPrng::from_seed_bytes(&[5, 6, 7, 8]).unwrap();
        let mut out_a = [0u8; 1024];
        let mut out_b = [0u8; 1024];
        a.next_bytes(&mut out_a);
        b.next_bytes(&mut out_b);
        assert_eq!(out_a, out_b);
        for _ in 0..1024 {
            assert!(a.next_i32_range(0, 100).is_ok());
        }
    }

    #[test]
    fn seed_round_trip() {
        let seed = [9u8, 8, 7, 6];
        let p = CellularAutomatonPrng::from_seed_bytes(&seed).unwrap();
        assert_eq!(p.seed().unwrap(), seed);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(CellularAutomatonPrng::from_seed_bytes(&[0, 0, 0]).is_err());
    }

    #[test]
    fn entropy_monotonicity() {
        let p = CellularAutomatonPrng::from_seed_bytes(&[0, 0, 0, 0]).unwrap();
        let before = p.entropy_bits();
        p.next_u32();
        assert_eq!(p.entropy_bits(), before - 32);
    }
}
