//! Size-gated zstd compression for stored values.
//!
//! Compressed values are plain zstd frames, so the frame magic makes them
//! self-identifying. The write path never compresses a value twice, and any
//! value it leaves raw under an enabled gate cannot start with the magic, so
//! the read path decompresses exactly the values that were compressed.
//!
//! A raw value that is itself a complete, decodable zstd frame is taken as
//! already compressed and reads back decompressed. Signatures are hash output
//! and never hit this in practice.
//!
//! Decompression is bounded by [`CompressionGate::max_decompressed_len`] so a
//! small frame cannot expand without limit before the blob is validated.

use std::borrow::Cow;
use std::io::Read;

use zstd::encode_all;
use zstd::stream::read::Decoder;

use crate::error::PackError;

/// Magic number that opens every zstd frame (`0xFD2FB528`, little-endian).
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Default zstd level.
pub const DEFAULT_LEVEL: i32 = 3;

/// Default cap on the size of one decompressed value.
pub const DEFAULT_MAX_DECOMPRESSED_LEN: usize = 16 << 20;

/// Compresses values longer than a threshold, and undoes it on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionGate {
    /// `None` disables compression entirely.
    threshold: Option<u64>,
    level: i32,
    max_decompressed_len: usize,
}

impl CompressionGate {
    /// A gate that never compresses.
    pub fn disabled() -> Self {
        Self {
            threshold: None,
            level: DEFAULT_LEVEL,
            max_decompressed_len: DEFAULT_MAX_DECOMPRESSED_LEN,
        }
    }

    /// Compress values strictly longer than `threshold` bytes.
    pub fn with_threshold(threshold: u64) -> Self {
        Self {
            threshold: Some(threshold),
            ..Self::disabled()
        }
    }

    /// Gate for a field's `compress` / `compress_threshold` settings.
    ///
    /// Compression off means disabled regardless of threshold. Compression on
    /// without a threshold compresses every non-empty value.
    pub fn from_field(compress: bool, threshold: Option<u64>) -> Self {
        match (compress, threshold) {
            (false, _) => Self::disabled(),
            (true, None) => Self::with_threshold(0),
            (true, Some(t)) => Self::with_threshold(t),
        }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn with_max_decompressed_len(mut self, limit: usize) -> Self {
        self.max_decompressed_len = limit;
        self
    }

    pub fn threshold(&self) -> Option<u64> {
        self.threshold
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn max_decompressed_len(&self) -> usize {
        self.max_decompressed_len
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold.is_some()
    }

    /// Compress `bytes` if they exceed the threshold and are not already a
    /// compressed frame; otherwise hand them back untouched.
    ///
    /// Raw values opening with the frame magic are compressed whatever their
    /// size, so they cannot be mistaken for frames on read. Idempotent:
    /// running the result through the gate again is a no-op.
    pub fn maybe_compress<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, PackError> {
        let Some(threshold) = self.threshold else {
            return Ok(Cow::Borrowed(bytes));
        };
        if is_compressed(bytes) {
            if self.is_valid_frame(bytes) {
                return Ok(Cow::Borrowed(bytes));
            }
        } else if bytes.len() as u64 <= threshold {
            return Ok(Cow::Borrowed(bytes));
        }
        Ok(Cow::Owned(encode_all(bytes, self.level)?))
    }

    /// Inverse of [`maybe_compress`](Self::maybe_compress) for this gate.
    ///
    /// With the gate enabled a magic-prefixed value must decode. With the gate
    /// disabled, values written while compression was on still decode, and a
    /// raw value that merely starts with the magic is returned as is.
    pub fn decompress<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, PackError> {
        if !is_compressed(bytes) {
            return Ok(Cow::Borrowed(bytes));
        }
        match decode_bounded(bytes, self.max_decompressed_len) {
            Ok(raw) => Ok(Cow::Owned(raw)),
            Err(PackError::Compression(_)) if !self.is_enabled() => Ok(Cow::Borrowed(bytes)),
            Err(err) => Err(err),
        }
    }

    // Raw values may start with the magic by accident; only a frame that
    // actually decodes counts as already compressed.
    fn is_valid_frame(&self, bytes: &[u8]) -> bool {
        decode_bounded(bytes, self.max_decompressed_len).is_ok()
    }
}

impl Default for CompressionGate {
    fn default() -> Self {
        Self::disabled()
    }
}

/// `true` if `bytes` open with the zstd frame magic.
pub fn is_compressed(bytes: &[u8]) -> bool {
    bytes.starts_with(&ZSTD_MAGIC)
}

/// Decompress any value carrying the frame magic, regardless of gate
/// settings, up to [`DEFAULT_MAX_DECOMPRESSED_LEN`] bytes.
///
/// Prefer [`CompressionGate::decompress`] when the field's gate is known.
pub fn decompress_if_needed(bytes: &[u8]) -> Result<Cow<'_, [u8]>, PackError> {
    if is_compressed(bytes) {
        Ok(Cow::Owned(decode_bounded(bytes, DEFAULT_MAX_DECOMPRESSED_LEN)?))
    } else {
        Ok(Cow::Borrowed(bytes))
    }
}

fn decode_bounded(bytes: &[u8], limit: usize) -> Result<Vec<u8>, PackError> {
    let decoder = Decoder::with_buffer(bytes)?;
    let mut out = Vec::new();
    decoder
        .take(limit as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() > limit {
        return Err(PackError::DecompressedTooLarge { limit });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compressible(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 7) as u8).collect()
    }

    fn magic_prefixed() -> Vec<u8> {
        let mut data = ZSTD_MAGIC.to_vec();
        data.extend(1u8..=8);
        data
    }

    #[test]
    fn disabled_gate_passes_through() {
        let data = compressible(4096);
        let out = CompressionGate::disabled().maybe_compress(&data).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, &data[..]);
    }

    #[test]
    fn at_or_below_threshold_passes_through() {
        let gate = CompressionGate::with_threshold(100);
        for len in [0, 1, 99, 100] {
            let data = compressible(len);
            let out = gate.maybe_compress(&data).unwrap();
            assert_eq!(&*out, &data[..], "len {len}");
        }
    }

    #[test]
    fn above_threshold_compresses() {
        let gate = CompressionGate::with_threshold(100);
        let data = compressible(101);
        let out = gate.maybe_compress(&data).unwrap();
        assert!(is_compressed(&out));
        assert_eq!(&*gate.decompress(&out).unwrap(), &data[..]);
        assert_eq!(&*decompress_if_needed(&out).unwrap(), &data[..]);
    }

    #[test]
    fn idempotent() {
        let gate = CompressionGate::with_threshold(10);
        let data = compressible(2048);
        let once = gate.maybe_compress(&data).unwrap().into_owned();
        let twice = gate.maybe_compress(&once).unwrap().into_owned();
        assert_eq!(once, twice);
    }

    #[test]
    fn magic_prefixed_value_round_trips_through_any_gate() {
        let data = magic_prefixed();
        for gate in [
            CompressionGate::disabled(),
            CompressionGate::with_threshold(0),
            CompressionGate::with_threshold(12),
            CompressionGate::with_threshold(1000),
        ] {
            let stored = gate.maybe_compress(&data).unwrap().into_owned();
            assert_eq!(&*gate.decompress(&stored).unwrap(), &data[..], "{gate:?}");
        }
    }

    #[test]
    fn enabled_gate_compresses_magic_prefixed_value_below_threshold() {
        let data = magic_prefixed();
        let stored = CompressionGate::with_threshold(1000)
            .maybe_compress(&data)
            .unwrap()
            .into_owned();
        assert_ne!(stored, data);
        assert_eq!(&*decompress_if_needed(&stored).unwrap(), &data[..]);
    }

    #[test]
    fn disabled_gate_still_reads_compressed_values() {
        let data = compressible(500);
        let stored = CompressionGate::with_threshold(0)
            .maybe_compress(&data)
            .unwrap()
            .into_owned();
        let read = CompressionGate::disabled().decompress(&stored).unwrap();
        assert_eq!(&*read, &data[..]);
    }

    #[test]
    fn uncompressed_read_path_borrows() {
        let data = b"plain".to_vec();
        assert!(matches!(decompress_if_needed(&data).unwrap(), Cow::Borrowed(_)));
        let gate = CompressionGate::with_threshold(0);
        assert!(matches!(gate.decompress(&data).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn corrupt_frame_is_compression_error() {
        let mut data = ZSTD_MAGIC.to_vec();
        data.extend_from_slice(&[0xFF; 8]);
        let err = decompress_if_needed(&data).unwrap_err();
        assert!(matches!(err, PackError::Compression(_)));
        assert!(!err.is_corruption());
        let err = CompressionGate::with_threshold(0).decompress(&data).unwrap_err();
        assert!(matches!(err, PackError::Compression(_)));
    }

    #[test]
    fn decompression_is_bounded() {
        let data = vec![0u8; 1 << 20];
        let gate = CompressionGate::with_threshold(0).with_max_decompressed_len(4096);
        let stored = gate.maybe_compress(&data).unwrap().into_owned();
        assert!(stored.len() < 4096);
        assert_eq!(
            gate.decompress(&stored).unwrap_err(),
            PackError::DecompressedTooLarge { limit: 4096 }
        );

        let roomy = gate.with_max_decompressed_len(1 << 20);
        assert_eq!(roomy.decompress(&stored).unwrap().len(), 1 << 20);
    }

    #[test]
    fn from_field_settings() {
        assert_eq!(CompressionGate::from_field(false, Some(10)), CompressionGate::disabled());
        assert_eq!(CompressionGate::from_field(true, None).threshold(), Some(0));
        assert_eq!(CompressionGate::from_field(true, Some(64)).threshold(), Some(64));
        assert!(!CompressionGate::default().is_enabled());
    }

    #[test]
    fn level_is_configurable() {
        let gate = CompressionGate::with_threshold(0).with_level(19);
        assert_eq!(gate.level(), 19);
        let data = compressible(1000);
        let out = gate.maybe_compress(&data).unwrap();
        assert_eq!(&*decompress_if_needed(&out).unwrap(), &data[..]);
    }
}
