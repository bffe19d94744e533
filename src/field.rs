//! The MinHash field mapper: text in, stored signature and doc-values out.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use minhash::{Analyzer, AnalyzerRegistry, HashFamily, Signature, SignatureConfig, SignatureError};
use packing::{CompressionGate, PackError, read_blob};
use thiserror::Error;
use tracing::{Level, debug};

use crate::config::{CONTENT_TYPE, FieldConfig};
use crate::document::DocumentBuilder;

/// Errors raised while indexing or reading a MinHash field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("failed to parse field value as base64: {0}")]
    InvalidBase64(String),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error("no minhash field named '{0}'")]
    UnknownField(String),
}

/// A stored field value as handed back by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bytes(Vec<u8>),
    /// Legacy textual form.
    Base64(String),
}

/// One configured MinHash field.
///
/// Holds the resolved analyzer and hash family so neither is rebuilt per
/// document.
#[derive(Clone)]
pub struct MinHashField {
    name: String,
    config: FieldConfig,
    signature: SignatureConfig,
    gate: CompressionGate,
    analyzer: Arc<dyn Analyzer>,
    family: Arc<dyn HashFamily>,
}

impl MinHashField {
    /// Resolve `config` against `analyzers`.
    pub fn new(
        name: impl Into<String>,
        config: FieldConfig,
        analyzers: &AnalyzerRegistry,
    ) -> Result<Self, FieldError> {
        let signature = config.signature_config();
        signature.validate()?;
        let analyzer = analyzers.get(&config.analyzer)?;
        let family: Arc<dyn HashFamily> = Arc::from(signature.build_family());
        Ok(Self {
            name: name.into(),
            gate: config.compression_gate(),
            config,
            signature,
            analyzer,
            family,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn gate(&self) -> &CompressionGate {
        &self.gate
    }

    /// Signature of `text`, or `None` when the analyzer yields no tokens.
    pub fn compute_signature(&self, text: &str) -> Result<Option<Signature>, FieldError> {
        let tokens = self.analyzer.analyze(text);
        Ok(minhash::signature_of(
            &tokens,
            self.family.as_ref(),
            &self.signature,
        )?)
    }

    /// Index one occurrence of this field into `doc`.
    ///
    /// Missing text, text without tokens, and fields that neither store nor
    /// keep doc values contribute nothing.
    pub fn parse_create_field(
        &self,
        text: Option<&str>,
        doc: &mut DocumentBuilder,
    ) -> Result<(), FieldError> {
        if !self.config.store && !self.config.doc_values {
            return Ok(());
        }
        let span = tracing::span!(Level::DEBUG, "minhash.parse_field", field = %self.name);
        let _guard = span.enter();

        let Some(text) = text else {
            debug!("skipped_null_value");
            return Ok(());
        };
        let Some(signature) = self.compute_signature(text)? else {
            debug!(text_len = text.len(), "skipped_no_tokens");
            return Ok(());
        };
        debug!(
            text_len = text.len(),
            signature_len = signature.len(),
            "computed_signature"
        );

        if self.config.store {
            let stored = self.gate.maybe_compress(signature.as_bytes())?.into_owned();
            doc.add_stored(&self.name, stored);
        }
        if self.config.doc_values {
            doc.add_doc_value(&self.name, self.gate, signature.into_bytes())?;
        }
        Ok(())
    }

    /// Bytes of a stored value, decompressed if this field's gate compressed it.
    pub fn value(&self, value: FieldValue) -> Result<Vec<u8>, FieldError> {
        let raw = match value {
            FieldValue::Bytes(bytes) => bytes,
            FieldValue::Base64(text) => STANDARD
                .decode(text.trim())
                .map_err(|err| FieldError::InvalidBase64(err.to_string()))?,
        };
        Ok(self.gate.decompress(&raw)?.into_owned())
    }

    /// Signatures packed into a doc-values blob.
    pub fn doc_values(&self, blob: &[u8]) -> Result<Vec<Vec<u8>>, FieldError> {
        Ok(read_blob(blob, &self.gate)?)
    }
}

impl std::fmt::Debug for MinHashField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinHashField")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("analyzer", &self.analyzer.name())
            .field("family", &self.family.name())
            .finish()
    }
}
