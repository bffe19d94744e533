//! Multi-value packing of per-document signatures.
//!
//! Blob layout:
//!
//! ```text
//! vint(count)
//! count × ( vint(len) | len raw bytes )
//! ```
//!
//! Values are sorted byte-lexicographically and deduplicated before they are
//! written, so the blob is a canonical encoding of the *set* of values: the
//! order of [`MultiValuePacker::add`] calls never shows up in the output.

use bytes::Bytes;

use crate::error::PackError;
use crate::vint::{read_vint, write_vint, MAX_VINT_LEN};

/// Accumulates the values contributed to one field of one document.
///
/// A packer belongs to exactly one document; it is consumed by
/// [`finalize`](Self::finalize), which releases the accumulation buffer.
#[derive(Debug, Default, Clone)]
pub struct MultiValuePacker {
    values: Vec<Vec<u8>>,
    total_size: usize,
}

impl MultiValuePacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A packer seeded with its first value.
    pub fn with_first(value: impl Into<Vec<u8>>) -> Result<Self, PackError> {
        let mut packer = Self::new();
        packer.add(value)?;
        Ok(packer)
    }

    /// Append a value. Duplicates are kept until [`finalize`](Self::finalize).
    pub fn add(&mut self, value: impl Into<Vec<u8>>) -> Result<(), PackError> {
        let value = value.into();
        if u32::try_from(value.len()).is_err() {
            return Err(PackError::ValueTooLarge { len: value.len() });
        }
        if self.values.len() >= u32::MAX as usize {
            return Err(PackError::TooManyValues);
        }
        self.total_size += value.len();
        self.values.push(value);
        Ok(())
    }

    /// Values added so far, duplicates included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of the raw value lengths added so far.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Sort, deduplicate and serialize.
    pub fn finalize(self) -> EncodedBlob {
        let Self {
            mut values,
            total_size,
        } = self;
        values.sort_unstable();
        values.dedup();

        let mut out = Vec::with_capacity(total_size + (values.len() + 1) * MAX_VINT_LEN);
        // Both casts were bounded in `add`.
        write_vint(&mut out, values.len() as u32);
        for value in &values {
            write_vint(&mut out, value.len() as u32);
            out.extend_from_slice(value);
        }
        EncodedBlob {
            bytes: Bytes::from(out),
        }
    }
}

/// An immutable packed blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedBlob {
    bytes: Bytes,
}

impl EncodedBlob {
    /// The blob for an empty value set: a zero count and nothing else.
    pub fn empty() -> Self {
        Self {
            bytes: Bytes::from_static(&[0]),
        }
    }

    /// Validate `bytes` as a blob and take ownership of them.
    pub fn parse(bytes: impl Into<Bytes>) -> Result<Self, PackError> {
        let bytes = bytes.into();
        PackedValues::new(&bytes)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`: even an empty value set carries its count header.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Iterate the packed values. A blob built by a packer is always valid, so
    /// this can only fail on a blob assembled from untrusted bytes.
    pub fn values(&self) -> Result<PackedValues<'_>, PackError> {
        PackedValues::new(&self.bytes)
    }
}

impl AsRef<[u8]> for EncodedBlob {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<EncodedBlob> for Vec<u8> {
    fn from(value: EncodedBlob) -> Self {
        value.bytes.to_vec()
    }
}

/// Zero-copy view over the values of a blob.
///
/// The whole blob is validated up front, so iteration itself cannot fail.
#[derive(Debug, Clone)]
pub struct PackedValues<'a> {
    bytes: &'a [u8],
    pos: usize,
    remaining: u32,
}

impl<'a> PackedValues<'a> {
    /// Validate the framing of `bytes`.
    ///
    /// Rejects truncated or oversized vints, a count that could not possibly
    /// fit in the buffer, any value running past the end, and trailing bytes.
    pub fn new(bytes: &'a [u8]) -> Result<Self, PackError> {
        let (count, start) = read_vint(bytes, 0)?;
        // Every value needs at least its one-byte length prefix.
        let left = bytes.len() - start;
        if count as usize > left {
            return Err(PackError::CountOutOfBounds {
                count,
                remaining: left,
            });
        }

        let mut pos = start;
        for index in 0..count {
            let (len, next) = read_vint(bytes, pos)?;
            let remaining = bytes.len() - next;
            if len as usize > remaining {
                return Err(PackError::LengthOutOfBounds {
                    index,
                    len,
                    remaining,
                });
            }
            pos = next + len as usize;
        }
        if pos != bytes.len() {
            return Err(PackError::TrailingBytes {
                extra: bytes.len() - pos,
            });
        }

        Ok(Self {
            bytes,
            pos: start,
            remaining: count,
        })
    }
}

impl<'a> Iterator for PackedValues<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // Framing was checked in `new`.
        let (len, start) = read_vint(self.bytes, self.pos).ok()?;
        let end = start + len as usize;
        self.pos = end;
        self.remaining -= 1;
        Some(&self.bytes[start..end])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for PackedValues<'_> {}

/// Pack `values` into a canonical blob.
pub fn pack_values<I, V>(values: I) -> Result<EncodedBlob, PackError>
where
    I: IntoIterator<Item = V>,
    V: Into<Vec<u8>>,
{
    let mut packer = MultiValuePacker::new();
    for value in values {
        packer.add(value)?;
    }
    Ok(packer.finalize())
}

/// Decode a blob into its values, in stored (ascending) order.
pub fn unpack_values(bytes: &[u8]) -> Result<Vec<Vec<u8>>, PackError> {
    Ok(PackedValues::new(bytes)?.map(<[u8]>::to_vec).collect())
}
