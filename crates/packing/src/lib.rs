//! # Simprint Packing
//!
//! Turns the signatures contributed to one document field into a single
//! stored blob and back.
//!
//! - [`MultiValuePacker`] accumulates values for one document, then
//!   [`finalize`](MultiValuePacker::finalize)s them into a canonical
//!   [`EncodedBlob`]: a vint count followed by vint-length-prefixed values,
//!   sorted and deduplicated.
//! - [`PackedValues`] / [`unpack_values`] decode a blob, rejecting any framing
//!   that runs past the end of the buffer.
//! - [`CompressionGate`] zstd-compresses values above a size threshold and
//!   undoes it on the read path, with a bound on the decompressed size.
//!
//! ```
//! use packing::{pack_values, unpack_values};
//!
//! let blob = pack_values([b"beta".to_vec(), b"alpha".to_vec(), b"beta".to_vec()]).unwrap();
//! let values = unpack_values(blob.as_bytes()).unwrap();
//! assert_eq!(values, vec![b"alpha".to_vec(), b"beta".to_vec()]);
//! ```

pub mod compress;
mod error;
pub mod packer;
pub mod vint;

pub use crate::compress::{
    decompress_if_needed, is_compressed, CompressionGate, DEFAULT_MAX_DECOMPRESSED_LEN, ZSTD_MAGIC,
};
pub use crate::error::PackError;
pub use crate::packer::{pack_values, unpack_values, EncodedBlob, MultiValuePacker, PackedValues};

use std::borrow::Cow;

use tracing::warn;

/// Read path for a stored blob: undo `gate`, then decode.
pub fn read_blob(stored: &[u8], gate: &CompressionGate) -> Result<Vec<Vec<u8>>, PackError> {
    let raw: Cow<'_, [u8]> = gate.decompress(stored)?;
    unpack_values(&raw).inspect_err(|err| {
        warn!(error = %err, stored_len = stored.len(), "corrupt packed blob");
    })
}

/// Write path for a document field: pack, then pass through `gate`.
pub fn write_blob<I, V>(values: I, gate: &CompressionGate) -> Result<Vec<u8>, PackError>
where
    I: IntoIterator<Item = V>,
    V: Into<Vec<u8>>,
{
    let blob = pack_values(values)?;
    Ok(gate.maybe_compress(blob.as_bytes())?.into_owned())
}
