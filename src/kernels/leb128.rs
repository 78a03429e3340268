//! This module contains the pure, stateless kernels for the unsigned varint
//! encoding used by every length and count on the wire.
//!
//! Seven payload bits per byte, least-significant group first, high bit set on
//! every byte except the last. Only the canonical (shortest) form is accepted on
//! decode: a terminating zero byte after a continuation byte is rejected, as is
//! any value that does not fit the target type. It is fully panic-free.

use num_traits::{PrimInt, Unsigned};

use crate::error::ChwireError;

//==================================================================================
// 1. Public API
//==================================================================================

/// Encodes a `u64` without the generic plumbing. This is the hot path used by
/// the cursor writer for every length prefix.
pub fn encode_u64(mut value: u64, buffer: &mut Vec<u8>) {
    while value >= 0x80 {
        buffer.push((value as u8) | 0x80);
        value >>= 7;
    }
    buffer.push(value as u8);
}

/// Decodes a single unsigned integer, pulling bytes from `next_byte` one at a time.
///
/// `next_byte` is the byte source; the cursor reader passes a closure over its
/// (possibly decompressed) input so the varint never has to be buffered first.
pub fn decode_from<T, F>(mut next_byte: F) -> Result<T, ChwireError>
where
    T: PrimInt + Unsigned,
    F: FnMut() -> Result<u8, ChwireError>,
{
    let mut result = T::zero();
    let mut shift = 0usize;
    let total_bits = std::mem::size_of::<T>() * 8;

    loop {
        let byte = next_byte()?;

        if shift >= total_bits {
            return Err(ChwireError::VarintDecode(
                "Integer overflow during decoding".to_string(),
            ));
        }

        let payload = T::from(byte & 0x7F).ok_or_else(|| {
            ChwireError::VarintDecode("Failed to create 7-bit payload from byte".to_string())
        })?;

        // Bits that would be shifted past the top of the type are an overflow.
        if shift + 7 > total_bits && u32::from(byte & 0x7F) >> (total_bits - shift) > 0 {
            return Err(ChwireError::VarintDecode(
                "Integer overflow during decoding".to_string(),
            ));
        }

        result = result | (payload << shift);

        if byte & 0x80 == 0 {
            if byte == 0 && shift > 0 {
                return Err(ChwireError::VarintDecode(
                    "Non-canonical encoding: trailing zero group".to_string(),
                ));
            }
            return Ok(result);
        }

        shift += 7;
    }
}
