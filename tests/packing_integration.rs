use simprint::{
    CompressionGate, EncodedBlob, FieldConfig, MultiValuePacker, PackError, ZSTD_MAGIC,
    compute_signature, decompress_if_needed, is_compressed, pack_values, read_blob, unpack_values,
};

fn signatures(texts: &[&str]) -> Vec<Vec<u8>> {
    let cfg = FieldConfig::default();
    texts
        .iter()
        .filter_map(|text| compute_signature(text, &cfg).unwrap())
        .map(|sig| sig.into_bytes())
        .collect()
}

#[test]
fn empty_sequence_round_trips() {
    let blob = pack_values(Vec::<Vec<u8>>::new()).unwrap();
    assert_eq!(blob.as_bytes(), &[0x00]);
    assert_eq!(blob, EncodedBlob::empty());
    assert!(unpack_values(blob.as_bytes()).unwrap().is_empty());
}

#[test]
fn signatures_round_trip_sorted() {
    let sigs = signatures(&["first document", "second document", "third one"]);
    let blob = pack_values(sigs.clone()).unwrap();
    let mut expected = sigs;
    expected.sort();
    assert_eq!(unpack_values(blob.as_bytes()).unwrap(), expected);
}

#[test]
fn packing_is_order_independent_and_deduplicated() {
    let sigs = signatures(&["a b c", "d e f", "g h i"]);
    let forward = pack_values(sigs.clone()).unwrap();
    let mut shuffled = sigs.clone();
    shuffled.reverse();
    shuffled.push(sigs[1].clone());
    let backward = pack_values(shuffled).unwrap();
    assert_eq!(forward.as_bytes(), backward.as_bytes());
    assert_eq!(unpack_values(backward.as_bytes()).unwrap().len(), 3);
}

#[test]
fn packer_accumulates_incrementally() {
    let sigs = signatures(&["one", "two"]);
    let mut packer = MultiValuePacker::with_first(sigs[0].clone()).unwrap();
    packer.add(sigs[1].clone()).unwrap();
    packer.add(sigs[0].clone()).unwrap();
    assert_eq!(packer.len(), 3);
    assert_eq!(packer.total_size(), 3 * 128);
    let blob = packer.finalize();
    // count, then two 128-byte values with two-byte length prefixes.
    assert_eq!(blob.len(), 1 + 2 * (2 + 128));
}

#[test]
fn compression_is_transparent_for_any_threshold() {
    let sigs = signatures(&["alpha beta", "gamma delta", "epsilon"]);
    let blob = pack_values(sigs).unwrap();
    for gate in [
        CompressionGate::disabled(),
        CompressionGate::with_threshold(0),
        CompressionGate::with_threshold(100),
        CompressionGate::with_threshold(10_000),
    ] {
        let stored = gate.maybe_compress(blob.as_bytes()).unwrap();
        let restored = gate.decompress(&stored).unwrap();
        assert_eq!(&*restored, blob.as_bytes(), "{gate:?}");
    }
}

#[test]
fn magic_prefixed_values_survive_every_gate() {
    let mut value = ZSTD_MAGIC.to_vec();
    value.extend(1u8..=8);
    for gate in [
        CompressionGate::disabled(),
        CompressionGate::with_threshold(0),
        CompressionGate::with_threshold(value.len() as u64),
        CompressionGate::with_threshold(4096),
    ] {
        let stored = gate.maybe_compress(&value).unwrap();
        assert_eq!(&*gate.decompress(&stored).unwrap(), &value[..], "{gate:?}");
    }
}

#[test]
fn oversized_frames_are_refused_on_read() {
    let gate = CompressionGate::with_threshold(0).with_max_decompressed_len(1024);
    let blob = pack_values([vec![0u8; 8192]]).unwrap();
    let stored = gate.maybe_compress(blob.as_bytes()).unwrap().into_owned();
    assert_eq!(
        read_blob(&stored, &gate),
        Err(PackError::DecompressedTooLarge { limit: 1024 })
    );
    assert!(read_blob(&stored, &CompressionGate::with_threshold(0)).is_ok());
}

#[test]
fn compression_is_idempotent() {
    let gate = CompressionGate::with_threshold(0);
    let blob = pack_values(signatures(&["x y z", "u v w"])).unwrap();
    let once = gate.maybe_compress(blob.as_bytes()).unwrap().into_owned();
    assert!(is_compressed(&once));
    let twice = gate.maybe_compress(&once).unwrap().into_owned();
    assert_eq!(once, twice);
}

#[test]
fn threshold_boundary() {
    let gate = CompressionGate::with_threshold(4);
    assert!(!is_compressed(&gate.maybe_compress(&[1, 2, 3, 4]).unwrap()));
    assert!(is_compressed(&gate.maybe_compress(&[1, 2, 3, 4, 5]).unwrap()));
}

#[test]
fn corrupt_blobs_are_rejected() {
    let cases: [&[u8]; 5] = [
        &[],
        &[0x80],
        &[0xFF, 0xFF, 0xFF, 0xFF, 0x7F],
        &[1, 3, 0],
        &[0, 0],
    ];
    for bytes in cases {
        let err = unpack_values(bytes).unwrap_err();
        assert!(err.is_corruption(), "{bytes:?} gave {err:?}");
    }
}

#[test]
fn compression_failures_are_not_corruption() {
    let mut bytes = ZSTD_MAGIC.to_vec();
    bytes.push(0);
    assert!(matches!(
        decompress_if_needed(&bytes),
        Err(PackError::Compression(_))
    ));
}
