use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use simprint::{
    AnalyzerRegistry, DocumentBuilder, FieldConfig, FieldError, FieldValue, MinHashField,
    MinHashMapper, MinHashSettings, is_compressed,
};

fn field(config: FieldConfig) -> MinHashField {
    MinHashField::new("content", config, &AnalyzerRegistry::default()).unwrap()
}

#[test]
fn repeated_field_packs_into_one_blob() {
    let f = field(FieldConfig::default());
    let mut doc = DocumentBuilder::new();
    for text in ["first value", "second value", "first value", "third"] {
        f.parse_create_field(Some(text), &mut doc).unwrap();
    }
    assert_eq!(doc.pending("content"), 4);
    let parsed = doc.finish().unwrap();
    assert_eq!(parsed.stored_values("content").len(), 4);

    let values = f.doc_values(parsed.doc_value("content").unwrap()).unwrap();
    assert_eq!(values.len(), 3);
    assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn documents_do_not_share_state() {
    let f = field(FieldConfig::default());
    let mut first = DocumentBuilder::new();
    f.parse_create_field(Some("only in first"), &mut first).unwrap();
    let mut second = DocumentBuilder::new();
    f.parse_create_field(Some("only in second"), &mut second).unwrap();

    let first = first.finish().unwrap();
    let second = second.finish().unwrap();
    assert_eq!(f.doc_values(first.doc_value("content").unwrap()).unwrap().len(), 1);
    assert_eq!(f.doc_values(second.doc_value("content").unwrap()).unwrap().len(), 1);
    assert_ne!(first.doc_value("content"), second.doc_value("content"));
}

#[test]
fn compressed_field_reads_back() {
    let f = field(FieldConfig::default().with_compress(true));
    let mut doc = DocumentBuilder::new();
    f.parse_create_field(Some("one two three"), &mut doc).unwrap();
    f.parse_create_field(Some("four five six"), &mut doc).unwrap();
    let parsed = doc.finish().unwrap();

    let blob = parsed.doc_value("content").unwrap();
    assert!(is_compressed(blob));
    assert_eq!(f.doc_values(blob).unwrap().len(), 2);

    for stored in parsed.stored_values("content") {
        assert!(is_compressed(stored));
        let raw = f.value(FieldValue::Bytes(stored.to_vec())).unwrap();
        assert_eq!(raw.len(), 128);
        // Legacy base64 form decodes to the same value.
        let legacy = f.value(FieldValue::Base64(STANDARD.encode(stored))).unwrap();
        assert_eq!(legacy, raw);
    }
}

#[test]
fn uncompressed_value_reads_back_unchanged() {
    let f = field(FieldConfig::default());
    let sig = f.compute_signature("plain text").unwrap().unwrap();
    let raw = f.value(FieldValue::Bytes(sig.as_bytes().to_vec())).unwrap();
    assert_eq!(raw, sig.into_bytes());
}

#[test]
fn bad_base64_is_a_parse_error() {
    let f = field(FieldConfig::default());
    assert!(matches!(
        f.value(FieldValue::Base64("@@@".into())),
        Err(FieldError::InvalidBase64(_))
    ));
}

#[test]
fn documents_encode_on_independent_threads() {
    let settings = MinHashSettings::single("content", FieldConfig::default());
    let mapper = MinHashMapper::new(settings).unwrap();
    let serial: Vec<_> = (0..4)
        .map(|i| {
            let text = format!("document number {i}");
            mapper.index_document([("content", Some(text.as_str()))]).unwrap()
        })
        .collect();

    let threaded: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let mapper = &mapper;
                scope.spawn(move || {
                    let text = format!("document number {i}");
                    mapper.index_document([("content", Some(text.as_str()))]).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(serial, threaded);
}
