//! Hash families for MinHash signatures.
//!
//! A hash family is a pure function of `(term, index)`. Every family in this
//! module is platform independent: terms are hashed as raw bytes and all
//! arithmetic is fixed-width integer math, so a term hashes to the same value
//! on every machine and in every release. Stored signatures depend on that.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// A deterministic family of `N` hash functions indexed by `index ∈ [0, N)`.
pub trait HashFamily: Send + Sync {
    /// Stable identifier, recorded alongside stored signatures.
    fn name(&self) -> &'static str;

    /// Hash `term` under the function at `index`.
    fn hash(&self, term: &[u8], index: usize) -> u64;
}

/// Default family: one xxh3 hash keyed with a per-index seed.
///
/// Each index gets its own key derived from the base seed, which simulates an
/// independent permutation per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xxh3Family {
    seed: u64,
}

impl Xxh3Family {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    fn key(&self, index: usize) -> u64 {
        let step = (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        splitmix64(self.seed.wrapping_add(step))
    }
}

impl HashFamily for Xxh3Family {
    fn name(&self) -> &'static str {
        "xxh3"
    }

    #[inline]
    fn hash(&self, term: &[u8], index: usize) -> u64 {
        xxh3_64_with_seed(term, self.key(index))
    }
}

/// Transparent family: the term's bytes read as a big-endian integer, offset
/// by a per-index seed and reduced modulo `modulus`.
///
/// Useless for similarity search but every output is computable by hand,
/// which makes it the family of choice for fixed regression vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityFamily {
    seeds: Vec<u64>,
    modulus: u64,
}

impl IdentityFamily {
    /// Indices beyond `seeds.len()` wrap around the seed list. A zero modulus
    /// is treated as `u64::MAX + 1` (no reduction).
    pub fn new(seeds: Vec<u64>, modulus: u64) -> Self {
        Self { seeds, modulus }
    }

    /// Seeds `1..=n`.
    pub fn sequential(n: usize, modulus: u64) -> Self {
        Self::new((1..=n as u64).collect(), modulus)
    }
}

impl HashFamily for IdentityFamily {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn hash(&self, term: &[u8], index: usize) -> u64 {
        let value = term
            .iter()
            .fold(0u64, |acc, &b| acc.wrapping_shl(8) | u64::from(b));
        let seed = if self.seeds.is_empty() {
            index as u64
        } else {
            self.seeds[index % self.seeds.len()]
        };
        let h = value.wrapping_add(seed);
        if self.modulus == 0 {
            h
        } else {
            h % self.modulus
        }
    }
}

/// Configurable selection of a hash family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFamilyKind {
    #[default]
    Xxh3,
    /// Identity over bytes, seeds `1..=N`, modulo 256.
    Identity,
}

impl HashFamilyKind {
    /// Build the family for `n` functions.
    pub fn build(self, seed: u64, n: usize) -> Box<dyn HashFamily> {
        match self {
            HashFamilyKind::Xxh3 => Box::new(Xxh3Family::new(seed)),
            HashFamilyKind::Identity => Box::new(IdentityFamily::sequential(n, 256)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HashFamilyKind::Xxh3 => "xxh3",
            HashFamilyKind::Identity => "identity",
        }
    }
}

/// A 64-bit finalizer with good avalanche behaviour.
#[inline]
pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn xxh3_family_output_is_pinned() {
        let family = Xxh3Family::new(0xF00D_BAAD_F00D_BAAD);
        assert_eq!(family.hash(b"term", 0), 0x1AC7_79D0_85E2_55C8);
        assert_eq!(family.hash(b"term", 2), 0x8AD8_9488_A764_F1C7);
        assert_eq!(xxh3_64_with_seed(b"abc", 0), 0x78AF_5F94_892F_3950);
    }

    #[test]
    fn xxh3_family_is_deterministic() {
        let family = Xxh3Family::new(42);
        assert_eq!(family.hash(b"term", 3), family.hash(b"term", 3));
        assert_eq!(
            Xxh3Family::new(42).hash(b"term", 3),
            Xxh3Family::new(42).hash(b"term", 3)
        );
    }

    #[test]
    fn xxh3_family_indices_act_as_distinct_functions() {
        let family = Xxh3Family::new(7);
        let values: HashSet<u64> = (0..64).map(|i| family.hash(b"same", i)).collect();
        assert_eq!(values.len(), 64);
    }

    #[test]
    fn xxh3_family_seed_changes_output() {
        let a = Xxh3Family::new(1).hash(b"term", 0);
        let b = Xxh3Family::new(2).hash(b"term", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn identity_family_matches_hand_computation() {
        let family = IdentityFamily::sequential(4, 256);
        let hashes: Vec<u64> = (0..4).map(|i| family.hash(b"a", i)).collect();
        assert_eq!(hashes, vec![98, 99, 100, 101]);
    }

    #[test]
    fn identity_family_wraps_seed_list_and_modulus() {
        let family = IdentityFamily::new(vec![10, 20], 100);
        // "ab" = 0x6162 = 24930
        assert_eq!(family.hash(b"ab", 0), (24930 + 10) % 100);
        assert_eq!(family.hash(b"ab", 1), (24930 + 20) % 100);
        assert_eq!(family.hash(b"ab", 2), (24930 + 10) % 100);
    }

    #[test]
    fn identity_family_zero_modulus_skips_reduction() {
        let family = IdentityFamily::new(vec![1], 0);
        assert_eq!(family.hash(&[0x01, 0x00], 0), 257);
    }

    #[test]
    fn kind_builds_named_family() {
        assert_eq!(HashFamilyKind::Xxh3.build(0, 4).name(), "xxh3");
        assert_eq!(HashFamilyKind::Identity.build(0, 4).name(), "identity");
        assert_eq!(HashFamilyKind::default(), HashFamilyKind::Xxh3);
    }

    #[test]
    fn kind_serde_uses_snake_case() {
        let json = serde_json::to_string(&HashFamilyKind::Identity).unwrap();
        assert_eq!(json, "\"identity\"");
        let kind: HashFamilyKind = serde_json::from_str("\"xxh3\"").unwrap();
        assert_eq!(kind, HashFamilyKind::Xxh3);
    }

    #[test]
    fn splitmix64_avalanche_effect() {
        let diff_bits = (splitmix64(1000) ^ splitmix64(1001)).count_ones();
        assert!(diff_bits > 16);
    }
}
