//! All MinHash fields of an index, built from [`MinHashSettings`].

use std::collections::BTreeMap;

use minhash::AnalyzerRegistry;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, MergeMode, MinHashSettings, merge};
use crate::document::{DocumentBuilder, ParsedDocument};
use crate::field::{FieldError, MinHashField};

#[derive(Debug, Error)]
pub enum MapperError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Resolved MinHash fields keyed by name.
#[derive(Debug, Clone)]
pub struct MinHashMapper {
    settings: MinHashSettings,
    analyzers: AnalyzerRegistry,
    fields: BTreeMap<String, MinHashField>,
}

impl MinHashMapper {
    /// Build with the default analyzers.
    pub fn new(settings: MinHashSettings) -> Result<Self, MapperError> {
        Self::with_analyzers(settings, AnalyzerRegistry::default())
    }

    pub fn with_analyzers(
        settings: MinHashSettings,
        analyzers: AnalyzerRegistry,
    ) -> Result<Self, MapperError> {
        let fields = build_fields(&settings, &analyzers)?;
        Ok(Self {
            settings,
            analyzers,
            fields,
        })
    }

    pub fn settings(&self) -> &MinHashSettings {
        &self.settings
    }

    pub fn field(&self, name: &str) -> Result<&MinHashField, FieldError> {
        self.fields
            .get(name)
            .ok_or_else(|| FieldError::UnknownField(name.to_string()))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Parse one document given as `(field, text)` pairs.
    ///
    /// A field may appear more than once; its signatures are packed together.
    pub fn index_document<'a, I>(&self, values: I) -> Result<ParsedDocument, FieldError>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut doc = DocumentBuilder::new();
        for (name, text) in values {
            self.field(name)?.parse_create_field(text, &mut doc)?;
        }
        Ok(doc.finish()?)
    }

    /// Merge `incoming` into the current settings.
    ///
    /// Fields present on both sides go through [`merge`]; new fields are
    /// added. With [`MergeMode::Simulate`] nothing changes on success.
    pub fn merge_settings(
        &mut self,
        incoming: &MinHashSettings,
        mode: MergeMode,
    ) -> Result<(), MapperError> {
        let mut merged = self.settings.clone();
        for (name, config) in &incoming.fields {
            let next = match self.settings.fields.get(name) {
                Some(base) => merge(base, config, mode).inspect_err(|err| {
                    warn!(field = %name, error = %err, "mapping_merge_conflict");
                })?,
                None => {
                    config.validate()?;
                    config.clone()
                }
            };
            merged.fields.insert(name.clone(), next);
        }

        let fields = build_fields(&merged, &self.analyzers)?;
        if mode == MergeMode::Apply {
            info!(fields = fields.len(), "mapping_merged");
            self.settings = merged;
            self.fields = fields;
        }
        Ok(())
    }
}

fn build_fields(
    settings: &MinHashSettings,
    analyzers: &AnalyzerRegistry,
) -> Result<BTreeMap<String, MinHashField>, FieldError> {
    settings
        .fields
        .iter()
        .map(|(name, config)| {
            MinHashField::new(name.clone(), config.clone(), analyzers)
                .map(|field| (name.clone(), field))
        })
        .collect()
}
