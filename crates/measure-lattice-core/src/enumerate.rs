//! Enumeration of every n-bit choice mask.
//!
//! Both the power set of a partition (bit j = "atom j is in the event") and
//! the path set of a lattice (bit k = "step k moved up") are the same walk
//! over `0..2^n`. The caller supplies a seed and a per-bit combine step; the
//! enumerator folds the bits of each mask in ascending order.

use crate::config::MAX_ENUMERATION_BITS;
use crate::error::LatticeError;
use crate::LatticeResult;

/// An n-bit binary choice space, bounded by a caller-supplied maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryEnumerator {
    bits: u32,
}

impl BinaryEnumerator {
    /// Fails with `LimitExceeded` when `bits` is above `max_bits` (or above
    /// what a `u64` mask can address).
    pub fn new(bits: u32, max_bits: u32, what: &str) -> LatticeResult<Self> {
        let cap = max_bits.min(MAX_ENUMERATION_BITS);
        if bits > cap {
            tracing::warn!(what, bits, cap, "enumeration refused");
            return Err(LatticeError::LimitExceeded {
                what: what.to_string(),
                requested: bits as u64,
                max: cap as u64,
            });
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// 2^bits
    pub fn cardinality(&self) -> u64 {
        1u64 << self.bits
    }

    pub fn full_mask(&self) -> u64 {
        self.cardinality() - 1
    }

    pub fn masks(&self) -> impl Iterator<Item = u64> {
        0..self.cardinality()
    }

    /// Fold every mask from `seed`, calling `step(acc, bit_index, is_set)`
    /// for bit indices `0..bits` in order. Returns `(mask, acc)` pairs in
    /// ascending mask order.
    pub fn fold<A, F>(&self, seed: A, mut step: F) -> Vec<(u64, A)>
    where
        A: Clone,
        F: FnMut(A, usize, bool) -> A,
    {
        tracing::debug!(bits = self.bits, count = self.cardinality(), "enumerating masks");
        let mut out = Vec::with_capacity(self.cardinality() as usize);
        for mask in self.masks() {
            let mut acc = seed.clone();
            for bit in 0..self.bits as usize {
                acc = step(acc, bit, is_set(mask, bit));
            }
            out.push((mask, acc));
        }
        out
    }
}

/// Whether bit `bit` of `mask` is set.
pub fn is_set(mask: u64, bit: usize) -> bool {
    (mask >> bit) & 1 == 1
}
