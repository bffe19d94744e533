use thiserror::Error;

/// Errors raised while packing, unpacking, or (de)compressing values.
///
/// Everything except [`PackError::Compression`] is an integrity failure of
/// the blob itself: the bytes are never truncated or padded to make them fit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    #[error("blob truncated at offset {offset}: expected a vint")]
    Truncated { offset: usize },

    #[error("vint at offset {offset} does not fit in 32 bits")]
    VarintOverflow { offset: usize },

    #[error("declared value count {count} exceeds the {remaining} bytes left in the blob")]
    CountOutOfBounds { count: u32, remaining: usize },

    #[error("value {index} declares {len} bytes but only {remaining} remain")]
    LengthOutOfBounds {
        index: u32,
        len: u32,
        remaining: usize,
    },

    #[error("{extra} trailing bytes after the last value")]
    TrailingBytes { extra: usize },

    #[error("value of {len} bytes exceeds the vint length range")]
    ValueTooLarge { len: usize },

    #[error("too many values for one field (limit {limit})", limit = u32::MAX)]
    TooManyValues,

    #[error("decompressed value exceeds the {limit} byte limit")]
    DecompressedTooLarge { limit: usize },

    #[error("compression error: {0}")]
    Compression(String),
}

impl PackError {
    /// `true` for failures of the blob's own framing, as opposed to compressor
    /// or capacity errors.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            PackError::Truncated { .. }
                | PackError::VarintOverflow { .. }
                | PackError::CountOutOfBounds { .. }
                | PackError::LengthOutOfBounds { .. }
                | PackError::TrailingBytes { .. }
        )
    }
}

impl From<std::io::Error> for PackError {
    fn from(e: std::io::Error) -> Self {
        PackError::Compression(e.to_string())
    }
}
