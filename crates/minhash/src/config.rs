//! Configuration and error types for signature generation.
//!
//! The generator is a pure function of `(token_set, config)`. Nothing in this
//! module touches I/O or the environment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::family::{HashFamily, HashFamilyKind};

/// Widest supported slot: a full `u64`.
pub const MAX_BAND_WIDTH: usize = 8;

/// Shape of the signatures produced for one field.
///
/// `hash_function_count`, `band_width`, `seed` and `family` are fixed for the
/// lifetime of an index: signatures produced under different values are not
/// comparable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureConfig {
    /// Number of hash functions (N), one signature slot each.
    pub hash_function_count: usize,
    /// Bytes kept from each slot's minimum hash (1..=8).
    pub band_width: usize,
    /// Base seed for seeded families.
    pub seed: u64,
    /// Hash family used for every slot.
    pub family: HashFamilyKind,
    /// Compute slots on the rayon pool. Output is identical either way.
    pub use_parallel: bool,
}

impl SignatureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hash_function_count(mut self, n: usize) -> Self {
        self.hash_function_count = n;
        self
    }

    pub fn with_band_width(mut self, width: usize) -> Self {
        self.band_width = width;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_family(mut self, family: HashFamilyKind) -> Self {
        self.family = family;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Total signature length in bytes (`N × width`).
    pub fn signature_len(&self) -> Result<usize, SignatureError> {
        signature_len(self.hash_function_count, self.band_width)
    }

    pub fn validate(&self) -> Result<(), SignatureError> {
        self.signature_len().map(|_| ())
    }

    /// Instantiate the configured hash family.
    pub fn build_family(&self) -> Box<dyn HashFamily> {
        self.family.build(self.seed, self.hash_function_count)
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            hash_function_count: 128,
            band_width: 1,
            seed: 0xF00D_BAAD_F00D_BAAD,
            family: HashFamilyKind::Xxh3,
            use_parallel: false,
        }
    }
}

/// Checked `count × width` for a signature shape.
///
/// Rejects a zero count, a width outside `1..=MAX_BAND_WIDTH` and a product
/// that overflows `usize`.
pub fn signature_len(count: usize, width: usize) -> Result<usize, SignatureError> {
    if count == 0 {
        return Err(SignatureError::InvalidHashFunctionCount { count });
    }
    if width == 0 || width > MAX_BAND_WIDTH {
        return Err(SignatureError::InvalidBandWidth { width });
    }
    count
        .checked_mul(width)
        .ok_or(SignatureError::SignatureLengthOverflow { count, width })
}

/// Errors returned by signature generation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid config: hash_function_count must be >= 1 (got {count})")]
    InvalidHashFunctionCount { count: usize },

    #[error("invalid config: band_width must be in 1..={max} (got {width})", max = MAX_BAND_WIDTH)]
    InvalidBandWidth { width: usize },

    #[error("invalid config: signature length overflow for count={count} width={width}")]
    SignatureLengthOverflow { count: usize, width: usize },

    #[error("unknown analyzer '{name}'")]
    UnknownAnalyzer { name: String },
}
