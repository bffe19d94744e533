//! MinHash similarity fields.
//!
//! Text is analyzed into a set of terms and reduced to a fixed-size MinHash
//! signature ([`minhash`]). The signatures a document contributes to one field
//! are packed into a single canonical blob and optionally zstd-compressed
//! ([`packing`]). This crate ties the two together behind a typed field
//! configuration.
//!
//! ```
//! use simprint::{FieldConfig, MinHashSettings, MinHashMapper};
//!
//! let settings = MinHashSettings::single("body", FieldConfig::default());
//! let mapper = MinHashMapper::new(settings).unwrap();
//! let doc = mapper
//!     .index_document([("body", Some("the quick brown fox")), ("body", Some("jumps"))])
//!     .unwrap();
//! let blob = doc.doc_value("body").unwrap();
//! let signatures = mapper.field("body").unwrap().doc_values(blob).unwrap();
//! assert_eq!(signatures.len(), 2);
//! ```

pub mod config;
pub mod document;
pub mod field;
pub mod mapper;

pub use crate::config::{
    CONTENT_TYPE, ConfigError, FieldConfig, MergeMode, MinHashSettings, format_byte_size, merge,
    parse_byte_size,
};
pub use crate::document::{DocumentBuilder, ParsedDocument, StoredValue};
pub use crate::field::{FieldError, FieldValue, MinHashField};
pub use crate::mapper::{MapperError, MinHashMapper};

pub use minhash::{
    Analyzer, AnalyzerRegistry, HashFamily, HashFamilyKind, IdentityFamily, ShingleAnalyzer,
    Signature, SignatureConfig, SignatureError, TokenSet, WhitespaceAnalyzer, Xxh3Family,
};
pub use packing::{
    CompressionGate, DEFAULT_MAX_DECOMPRESSED_LEN, EncodedBlob, MultiValuePacker, PackError,
    ZSTD_MAGIC, decompress_if_needed, is_compressed, pack_values, read_blob, unpack_values,
    write_blob,
};

/// Signature of `text` under `config`, using the default analyzers.
///
/// `Ok(None)` when the text has no tokens.
pub fn compute_signature(text: &str, config: &FieldConfig) -> Result<Option<Signature>, FieldError> {
    let analyzer = AnalyzerRegistry::default().get(&config.analyzer)?;
    Ok(minhash::compute_signature(
        text,
        analyzer.as_ref(),
        &config.signature_config(),
    )?)
}
