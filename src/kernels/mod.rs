//! This module contains the pure, stateless kernels the cursor delegates to:
//! the varint encoding, the compression codecs and the frame checksum.
//!
//! `codec_for` is the single dispatch point from a wire method byte (or a
//! configured `CompressionMethod`) to a compression capability.

pub mod checksum;
pub mod leb128;
pub mod lz4;
pub mod zstd;

use crate::config::CompressionMethod;
use crate::error::ChwireError;
use crate::traits::{Compressor, Decompressor};

//==================================================================================
// 1. Wire Method Bytes
//==================================================================================

/// Method byte of an uncompressed ("none") frame.
pub const METHOD_NONE: u8 = 0x02;
/// Method byte of an LZ4 frame.
pub const METHOD_LZ4: u8 = 0x82;
/// Method byte of a ZSTD frame.
pub const METHOD_ZSTD: u8 = 0x90;

//==================================================================================
// 2. Codec Implementations
//==================================================================================

/// Stores the payload verbatim inside a frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

/// LZ4 block codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

/// Zstandard codec with a fixed compression level.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    pub level: i32,
}

impl Compressor for IdentityCodec {
    fn method(&self) -> u8 {
        METHOD_NONE
    }
    fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), ChwireError> {
        output.extend_from_slice(input);
        Ok(())
    }
}

impl Decompressor for IdentityCodec {
    fn decompress(
        &self,
        input: &[u8],
        decompressed_size: usize,
        output: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        if input.len() != decompressed_size {
            return Err(ChwireError::Decompression(format!(
                "uncompressed frame carries {} bytes but declares {}",
                input.len(),
                decompressed_size
            )));
        }
        output.extend_from_slice(input);
        Ok(())
    }
}

impl Compressor for Lz4Codec {
    fn method(&self) -> u8 {
        METHOD_LZ4
    }
    fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), ChwireError> {
        lz4::encode(input, output)
    }
}

impl Decompressor for Lz4Codec {
    fn decompress(
        &self,
        input: &[u8],
        decompressed_size: usize,
        output: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        lz4::decode(input, decompressed_size, output)
    }
}

impl Compressor for ZstdCodec {
    fn method(&self) -> u8 {
        METHOD_ZSTD
    }
    fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), ChwireError> {
        zstd::encode(input, self.level, output)
    }
}

impl Decompressor for ZstdCodec {
    fn decompress(
        &self,
        input: &[u8],
        decompressed_size: usize,
        output: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        zstd::decode(input, decompressed_size, output)
    }
}

//==================================================================================
// 3. Dispatch
//==================================================================================

/// Returns the compressor configured by `method`.
pub fn compressor_for(method: CompressionMethod, zstd_level: i32) -> Box<dyn Compressor> {
    match method {
        CompressionMethod::None => Box::new(IdentityCodec),
        CompressionMethod::Lz4 => Box::new(Lz4Codec),
        CompressionMethod::Zstd => Box::new(ZstdCodec { level: zstd_level }),
    }
}

/// Returns the decompressor for a method byte read from a frame header.
pub fn codec_for(method_byte: u8) -> Result<Box<dyn Decompressor>, ChwireError> {
    match method_byte {
        METHOD_NONE => Ok(Box::new(IdentityCodec)),
        METHOD_LZ4 => Ok(Box::new(Lz4Codec)),
        // Level is irrelevant for decompression.
        METHOD_ZSTD => Ok(Box::new(ZstdCodec { level: 0 })),
        other => Err(ChwireError::UnknownCompressionMethod(other)),
    }
}
