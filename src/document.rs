//! Per-document accumulation of MinHash field output.

use std::collections::BTreeMap;

use packing::{CompressionGate, MultiValuePacker, PackError};
use tracing::debug;

/// One stored occurrence of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub field: String,
    pub bytes: Vec<u8>,
}

/// Collects what the fields of one document contribute while it is parsed.
///
/// Each field gets its own packer, created on the first value and finalized
/// by [`finish`](Self::finish). A builder is never shared between documents.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    stored: Vec<StoredValue>,
    packers: BTreeMap<String, (MultiValuePacker, CompressionGate)>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stored(&mut self, field: &str, bytes: Vec<u8>) {
        self.stored.push(StoredValue {
            field: field.to_string(),
            bytes,
        });
    }

    /// Add a value to the field's doc-values packer.
    ///
    /// The gate of the first value for a field is the one applied at finish.
    pub fn add_doc_value(
        &mut self,
        field: &str,
        gate: CompressionGate,
        value: Vec<u8>,
    ) -> Result<(), PackError> {
        match self.packers.get_mut(field) {
            Some((packer, _)) => packer.add(value),
            None => {
                let packer = MultiValuePacker::with_first(value)?;
                self.packers.insert(field.to_string(), (packer, gate));
                Ok(())
            }
        }
    }

    /// Number of values waiting in `field`'s packer, duplicates included.
    pub fn pending(&self, field: &str) -> usize {
        self.packers.get(field).map_or(0, |(packer, _)| packer.len())
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty() && self.packers.is_empty()
    }

    /// Finalize every packer and gate each blob.
    pub fn finish(self) -> Result<ParsedDocument, PackError> {
        let mut doc_values = BTreeMap::new();
        for (field, (packer, gate)) in self.packers {
            let values = packer.len();
            let blob = packer.finalize();
            let bytes = gate.maybe_compress(blob.as_bytes())?.into_owned();
            debug!(
                field = %field,
                values,
                packed_len = blob.len(),
                stored_len = bytes.len(),
                "packed_doc_values"
            );
            doc_values.insert(field, bytes);
        }
        Ok(ParsedDocument {
            stored: self.stored,
            doc_values,
        })
    }
}

/// Output of parsing one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Stored values in the order they were produced.
    pub stored: Vec<StoredValue>,
    /// One blob per field, possibly compressed.
    pub doc_values: BTreeMap<String, Vec<u8>>,
}

impl ParsedDocument {
    pub fn stored_values(&self, field: &str) -> Vec<&[u8]> {
        self.stored
            .iter()
            .filter(|value| value.field == field)
            .map(|value| value.bytes.as_slice())
            .collect()
    }

    pub fn doc_value(&self, field: &str) -> Option<&[u8]> {
        self.doc_values.get(field).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packing::{is_compressed, read_blob};

    #[test]
    fn empty_builder_finishes_empty() {
        let doc = DocumentBuilder::new().finish().unwrap();
        assert_eq!(doc, ParsedDocument::default());
    }

    #[test]
    fn packs_per_field() {
        let mut doc = DocumentBuilder::new();
        let gate = CompressionGate::disabled();
        doc.add_doc_value("a", gate, vec![2]).unwrap();
        doc.add_doc_value("b", gate, vec![9]).unwrap();
        doc.add_doc_value("a", gate, vec![1]).unwrap();
        doc.add_doc_value("a", gate, vec![2]).unwrap();
        assert_eq!(doc.pending("a"), 3);
        assert_eq!(doc.pending("c"), 0);

        let parsed = doc.finish().unwrap();
        assert_eq!(parsed.doc_value("a").unwrap(), &[2, 1, 1, 1, 2]);
        assert_eq!(parsed.doc_value("b").unwrap(), &[1, 1, 9]);
    }

    #[test]
    fn gate_applies_to_packed_blob() {
        let mut doc = DocumentBuilder::new();
        let gate = CompressionGate::with_threshold(32);
        for i in 0u8..8 {
            doc.add_doc_value("f", gate, vec![i; 16]).unwrap();
        }
        let parsed = doc.finish().unwrap();
        let blob = parsed.doc_value("f").unwrap();
        assert!(is_compressed(blob));
        assert_eq!(read_blob(blob, &gate).unwrap().len(), 8);
    }

    #[test]
    fn stored_values_keep_order() {
        let mut doc = DocumentBuilder::new();
        doc.add_stored("f", vec![3]);
        doc.add_stored("g", vec![0]);
        doc.add_stored("f", vec![1]);
        let parsed = doc.finish().unwrap();
        assert_eq!(parsed.stored_values("f"), vec![&[3u8][..], &[1u8][..]]);
    }
}
