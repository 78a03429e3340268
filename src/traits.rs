//! This module defines the shared capability traits the cursor delegates to.
//!
//! The codec owns the wire framing of a compressed block but never the
//! compression algorithm itself; anything implementing these traits can be
//! plugged in behind a method byte.

use crate::error::ChwireError;

/// Compresses one block body into a frame payload.
pub trait Compressor: Send + Sync {
    /// The method byte written into the frame header.
    fn method(&self) -> u8;

    /// Appends the compressed form of `input` to `output`.
    fn compress(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), ChwireError>;
}

/// Restores a frame payload to the block body it was built from.
pub trait Decompressor: Send + Sync {
    /// Appends exactly `decompressed_size` bytes to `output`, or fails.
    fn decompress(
        &self,
        input: &[u8],
        decompressed_size: usize,
        output: &mut Vec<u8>,
    ) -> Result<(), ChwireError>;
}
