//! Shared low-level helpers for the column family: little-endian bulk
//! conversion of `u64` offset arrays and the offset bookkeeping used by every
//! column that stores one.

use std::ops::Range;

use crate::cursor::Reader;
use crate::error::ChwireError;

//==================================================================================
// 1. Little-Endian Bulk Conversion
//==================================================================================

/// Appends `values` to `out` as consecutive little-endian `u64`s.
pub fn extend_le_u64(values: &[u64], out: &mut Vec<u8>) {
    #[cfg(target_endian = "little")]
    out.extend_from_slice(bytemuck::cast_slice(values));
    #[cfg(not(target_endian = "little"))]
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Decodes consecutive little-endian `u64`s. A trailing partial word is ignored;
/// callers size `bytes` exactly.
pub fn decode_le_u64(bytes: &[u8], out: &mut Vec<u64>) {
    out.extend(bytes.chunks_exact(8).map(|chunk| {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        u64::from_le_bytes(word)
    }));
}

//==================================================================================
// 2. Offset Bookkeeping
//==================================================================================

/// The element range of `row` given cumulative end offsets.
pub fn offset_range(offsets: &[u64], row: usize) -> Range<usize> {
    let start = if row == 0 { 0 } else { offsets[row - 1] as usize };
    start..offsets[row] as usize
}

/// The total element count described by `offsets`.
pub fn last_offset(offsets: &[u64]) -> u64 {
    offsets.last().copied().unwrap_or(0)
}

/// Reads `num` offsets into `out` (cleared first), rejecting a decreasing
/// sequence. `scratch` is reused between calls.
pub fn read_offsets(
    r: &mut Reader,
    num: usize,
    scratch: &mut Vec<u8>,
    out: &mut Vec<u64>,
) -> Result<(), ChwireError> {
    out.clear();
    scratch.clear();
    let len = num
        .checked_mul(8)
        .ok_or_else(|| ChwireError::VarintDecode(format!("{} offsets overflow usize", num)))?;
    r.read_into(scratch, len)?;
    decode_le_u64(scratch, out);
    if let Some(pos) = out.windows(2).position(|w| w[1] < w[0]) {
        return Err(ChwireError::Validation {
            column: String::new(),
            reason: format!("offsets decrease at row {}", pos + 1),
        });
    }
    Ok(())
}

/// Checks that `offsets` never decrease and end exactly at `inner_rows`.
pub fn check_offsets(offsets: &[u64], inner_rows: usize) -> Result<(), String> {
    if let Some(pos) = offsets.windows(2).position(|w| w[1] < w[0]) {
        return Err(format!("offsets decrease at row {}", pos + 1));
    }
    let last = last_offset(offsets);
    if last != inner_rows as u64 {
        return Err(format!(
            "last offset is {} but the inner column has {} rows",
            last, inner_rows
        ));
    }
    Ok(())
}
