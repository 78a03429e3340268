//! This module contains the pure, stateless kernels for LZ4 block compression.
//!
//! The payload is a raw LZ4 block with no size prefix; the decompressed size is
//! carried by the wire frame header and handed back in on decode.

use crate::error::ChwireError;

/// Compresses a byte slice into a raw LZ4 block, appending to an output buffer.
pub fn encode(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), ChwireError> {
    let compressed = lz4::block::compress(input_bytes, None, false)
        .map_err(|e| ChwireError::Compression(format!("lz4: {}", e)))?;
    output_buf.extend_from_slice(&compressed);
    Ok(())
}

/// Decompresses a raw LZ4 block of known decompressed size.
pub fn decode(
    input_bytes: &[u8],
    decompressed_size: usize,
    output_buf: &mut Vec<u8>,
) -> Result<(), ChwireError> {
    let size = i32::try_from(decompressed_size).map_err(|_| {
        ChwireError::Decompression(format!(
            "lz4: decompressed size {} does not fit a block",
            decompressed_size
        ))
    })?;
    let decompressed = lz4::block::decompress(input_bytes, Some(size))
        .map_err(|e| ChwireError::Decompression(format!("lz4: {}", e)))?;

    if decompressed.len() != decompressed_size {
        return Err(ChwireError::Decompression(format!(
            "lz4: expected {} bytes, got {}",
            decompressed_size,
            decompressed.len()
        )));
    }
    output_buf.extend_from_slice(&decompressed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lz4_roundtrip() {
        let data = b"ACGTACGTACGTACGT".repeat(100);
        let mut compressed = Vec::new();
        encode(&data, &mut compressed).unwrap();
        assert!(compressed.len() < data.len());

        let mut decompressed = Vec::new();
        decode(&compressed, data.len(), &mut decompressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_lz4_wrong_size_is_rejected() {
        let data = vec![7u8; 512];
        let mut compressed = Vec::new();
        encode(&data, &mut compressed).unwrap();

        let mut out = Vec::new();
        assert!(decode(&compressed, 100, &mut out).is_err());
    }
}
