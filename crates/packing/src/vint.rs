//! Variable-length unsigned integers.
//!
//! Seven value bits per byte, least-significant group first, high bit set on
//! every byte except the last. A `u32` takes at most five bytes.

use crate::error::PackError;

/// Longest encoding of a `u32`.
pub const MAX_VINT_LEN: usize = 5;

/// Append `value` to `buf`.
pub fn write_vint(buf: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Encoded size of `value` in bytes.
pub fn vint_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Decode the vint starting at `offset`, returning the value and the offset
/// just past it.
pub fn read_vint(bytes: &[u8], offset: usize) -> Result<(u32, usize), PackError> {
    let mut value: u32 = 0;
    let mut pos = offset;
    for shift in (0..MAX_VINT_LEN as u32).map(|i| i * 7) {
        let byte = *bytes.get(pos).ok_or(PackError::Truncated { offset })?;
        pos += 1;
        // The fifth byte only has room for the top four bits of a u32.
        if shift == 28 && byte > 0x0F {
            return Err(PackError::VarintOverflow { offset });
        }
        value |= u32::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, pos));
        }
    }
    Err(PackError::VarintOverflow { offset })
}
