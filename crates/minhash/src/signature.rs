//! Signature generation over a token set.
//!
//! Slot `i` of a signature holds the minimum of `family.hash(term, i)` over
//! all terms, truncated to its low `width` bytes and written big-endian.
//! Big-endian keeps byte-lexicographic order aligned with numeric order
//! inside each slot.

use rayon::prelude::*;

use crate::analyzer::TokenSet;
use crate::config::{SignatureError, signature_len};
use crate::family::HashFamily;

/// Fixed-length MinHash signature: `N` slots of `width` bytes each.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    bytes: Vec<u8>,
    width: usize,
}

impl Signature {
    /// Wrap raw signature bytes. Returns `None` when `width` is zero or does
    /// not divide the byte length.
    pub fn from_bytes(bytes: Vec<u8>, width: usize) -> Option<Self> {
        if width == 0 || bytes.len() % width != 0 {
            return None;
        }
        Some(Self { bytes, width })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Bytes per slot.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of slots (hash functions).
    pub fn len(&self) -> usize {
        self.bytes.len() / self.width
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Per-function slots, `width` bytes each.
    pub fn slots(&self) -> std::slice::ChunksExact<'_, u8> {
        self.bytes.chunks_exact(self.width)
    }

    /// Slot values decoded back to integers.
    pub fn slot_values(&self) -> impl Iterator<Item = u64> + '_ {
        self.slots()
            .map(|slot| slot.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Groups of `rows_per_band` consecutive slots, for LSH candidate
    /// bucketing. The last band is shorter when the slot count is not a
    /// multiple of `rows_per_band`.
    pub fn bands(&self, rows_per_band: usize) -> std::slice::Chunks<'_, u8> {
        self.bytes.chunks(rows_per_band.max(1) * self.width)
    }

    /// Fraction of slots equal in both signatures, an estimate of the Jaccard
    /// similarity of the underlying token sets. Signatures of different shape
    /// score 0.
    pub fn matching_fraction(&self, other: &Signature) -> f64 {
        if self.width != other.width || self.bytes.len() != other.bytes.len() || self.is_empty() {
            return 0.0;
        }
        let equal = self
            .slots()
            .zip(other.slots())
            .filter(|(a, b)| a == b)
            .count();
        equal as f64 / self.len() as f64
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Signature> for Vec<u8> {
    fn from(value: Signature) -> Self {
        value.bytes
    }
}

/// Compute the MinHash signature of `tokens`.
///
/// Returns `Ok(None)` for an empty token set: no tokens means no contribution,
/// never a degenerate signature that would match every other empty input.
/// A zero `n`, a `width` outside `1..=8` or an `n × width` overflow is an
/// error; a returned signature is always exactly `n × width` bytes.
pub fn generate(
    tokens: &TokenSet,
    family: &dyn HashFamily,
    n: usize,
    width: usize,
) -> Result<Option<Signature>, SignatureError> {
    generate_with(tokens, family, n, width, false)
}

/// [`generate`] with an explicit choice of the parallel slot loop.
pub fn generate_with(
    tokens: &TokenSet,
    family: &dyn HashFamily,
    n: usize,
    width: usize,
    use_parallel: bool,
) -> Result<Option<Signature>, SignatureError> {
    let len = signature_len(n, width)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    let terms: Vec<&[u8]> = tokens.iter().collect();

    let mut bytes = vec![0u8; len];
    if use_parallel {
        bytes
            .par_chunks_exact_mut(width)
            .enumerate()
            .for_each(|(i, slot)| write_slot(slot, min_hash(&terms, family, i)));
    } else {
        for (i, slot) in bytes.chunks_exact_mut(width).enumerate() {
            write_slot(slot, min_hash(&terms, family, i));
        }
    }

    Ok(Some(Signature { bytes, width }))
}

#[inline]
fn min_hash(terms: &[&[u8]], family: &dyn HashFamily, index: usize) -> u64 {
    terms
        .iter()
        .map(|term| family.hash(term, index))
        .min()
        .unwrap_or(u64::MAX)
}

/// Low `slot.len()` bytes of `value`, big-endian.
#[inline]
fn write_slot(slot: &mut [u8], value: u64) {
    let be = value.to_be_bytes();
    slot.copy_from_slice(&be[be.len() - slot.len()..]);
}
