//! This module contains the pure, stateless kernels for performing
//! Zstandard compression and decompression of a block body.
//!
//! The payload is a bare zstd frame; the uncompressed size travels in the
//! enclosing wire frame header, so nothing is prepended here.
//! This module is a safe, panic-free wrapper around the `zstd` crate.

use crate::error::ChwireError;

/// Compresses a byte slice using the Zstandard algorithm, appending to an output buffer.
pub fn encode(input_bytes: &[u8], level: i32, output_buf: &mut Vec<u8>) -> Result<(), ChwireError> {
    let compressed = zstd::bulk::compress(input_bytes, level)
        .map_err(|e| ChwireError::Compression(format!("zstd: {}", e)))?;
    output_buf.extend_from_slice(&compressed);
    Ok(())
}

/// Decompresses a Zstandard payload whose decompressed size is known up front.
pub fn decode(
    input_bytes: &[u8],
    decompressed_size: usize,
    output_buf: &mut Vec<u8>,
) -> Result<(), ChwireError> {
    let decompressed = zstd::bulk::decompress(input_bytes, decompressed_size)
        .map_err(|e| ChwireError::Decompression(format!("zstd: {}", e)))?;

    if decompressed.len() != decompressed_size {
        return Err(ChwireError::Decompression(format!(
            "zstd: decompressed size does not match header. Expected {}, got {}.",
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
    fn test_zstd_roundtrip_simple_text() {
        let original_bytes =
            b"hello world, this is a test of zstd compression. hello world, this is a test."
                .to_vec();
        let mut compressed = Vec::new();
        encode(&original_bytes, 3, &mut compressed).unwrap();

        let mut decompressed = Vec::new();
        decode(&compressed, original_bytes.len(), &mut decompressed).unwrap();
        assert_eq!(original_bytes, decompressed);
    }

    #[test]
    fn test_zstd_roundtrip_highly_compressible_data() {
        let original_bytes = vec![42u8; 10_000];
        let mut compressed = Vec::new();
        encode(&original_bytes, 5, &mut compressed).unwrap();
        assert!(compressed.len() < 50);

        let mut decompressed = Vec::new();
        decode(&compressed, original_bytes.len(), &mut decompressed).unwrap();
        assert_eq!(original_bytes, decompressed);
    }

    #[test]
    fn test_zstd_decompress_invalid_data() {
        let mut out = Vec::new();
        let result = decode(&[1, 2, 3, 4, 5], 5, &mut out);
        assert!(result.unwrap_err().to_string().contains("zstd"));
    }
}
