//! # Simprint MinHash
//!
//! Fixed-size MinHash signatures for near-duplicate and Jaccard-similarity
//! retrieval.
//!
//! ## Contract
//!
//! - Text analysis is pluggable: an [`Analyzer`] turns text into a
//!   [`TokenSet`]. Two small analyzers ship with the crate.
//! - A [`HashFamily`] is a pure function of `(term, index)`.
//! - [`generate`] takes the per-index minimum over the token set and packs
//!   each minimum into `width` big-endian bytes.
//!
//! Invariant: the same token set under the same [`SignatureConfig`] yields a
//! byte-identical signature on every platform and in every run.
//!
//! An empty token set yields no signature at all (`None`), never a
//! placeholder that would spuriously match other empty inputs.
//!
//! ## Example
//!
//! ```
//! use minhash::{compute_signature, SignatureConfig, WhitespaceAnalyzer};
//!
//! let cfg = SignatureConfig::new().with_hash_function_count(16);
//! let analyzer = WhitespaceAnalyzer::default();
//!
//! let sig = compute_signature("the quick brown fox", &analyzer, &cfg)
//!     .unwrap()
//!     .expect("non-empty text has a signature");
//! assert_eq!(sig.as_bytes().len(), 16);
//!
//! assert!(compute_signature("   ", &analyzer, &cfg).unwrap().is_none());
//! ```

pub mod analyzer;
pub mod config;
pub mod family;
pub mod signature;

use tracing::trace;

pub use crate::analyzer::{
    Analyzer, AnalyzerRegistry, ShingleAnalyzer, TokenSet, WhitespaceAnalyzer,
};
pub use crate::config::{MAX_BAND_WIDTH, SignatureConfig, SignatureError, signature_len};
pub use crate::family::{HashFamily, HashFamilyKind, IdentityFamily, Xxh3Family};
pub use crate::signature::{generate, generate_with, Signature};

/// Analyze `text` and compute its signature under `cfg`.
///
/// `Ok(None)` means the analyzer produced no tokens; that is an absence, not
/// an error.
pub fn compute_signature(
    text: &str,
    analyzer: &dyn Analyzer,
    cfg: &SignatureConfig,
) -> Result<Option<Signature>, SignatureError> {
    cfg.validate()?;
    let tokens = analyzer.analyze(text);
    let family = cfg.build_family();
    let signature = signature_of(&tokens, family.as_ref(), cfg)?;
    trace!(
        analyzer = analyzer.name(),
        family = family.name(),
        tokens = tokens.len(),
        produced = signature.is_some(),
        "computed signature"
    );
    Ok(signature)
}

/// Signature of an already-analyzed token set under `cfg`.
///
/// The caller supplies the family so it can be built once and reused across
/// many inputs.
pub fn signature_of(
    tokens: &TokenSet,
    family: &dyn HashFamily,
    cfg: &SignatureConfig,
) -> Result<Option<Signature>, SignatureError> {
    generate_with(
        tokens,
        family,
        cfg.hash_function_count,
        cfg.band_width,
        cfg.use_parallel,
    )
}
