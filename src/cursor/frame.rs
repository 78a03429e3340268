// In: src/cursor/frame.rs

//! Defines the compressed frame that wraps a block body on the wire.
//!
//! ```text
//! checksum[16] | method u8 | compressed_size u32 LE | decompressed_size u32 LE | payload
//! ```
//!
//! `compressed_size` counts the 9 header bytes after the checksum plus the
//! payload. The checksum covers the same range. The cursor owns this framing;
//! the payload itself is produced and consumed by a `Compressor`/`Decompressor`.

use std::io::Read;

use crate::error::ChwireError;
use crate::kernels::{self, checksum};
use crate::traits::Compressor;

//==================================================================================
// Format Constants
//==================================================================================
/// Bytes taken by the checksum at the start of every frame.
pub const CHECKSUM_SIZE: usize = 16;
/// Bytes taken by method + compressed size + decompressed size.
pub const HEADER_SIZE: usize = 9;

/// The parsed fixed-size part of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub checksum: u128,
    pub method: u8,
    pub compressed_size: u32,
    pub decompressed_size: u32,
}

impl FrameHeader {
    fn parse(raw: &[u8; CHECKSUM_SIZE + HEADER_SIZE]) -> Self {
        let mut sum = [0u8; CHECKSUM_SIZE];
        sum.copy_from_slice(&raw[..CHECKSUM_SIZE]);
        let h = &raw[CHECKSUM_SIZE..];
        Self {
            checksum: checksum::from_wire(sum),
            method: h[0],
            compressed_size: u32::from_le_bytes([h[1], h[2], h[3], h[4]]),
            decompressed_size: u32::from_le_bytes([h[5], h[6], h[7], h[8]]),
        }
    }

    /// Length of the payload that follows the header.
    pub fn payload_len(&self) -> usize {
        self.compressed_size as usize - HEADER_SIZE
    }
}

//==================================================================================
// Encoding
//==================================================================================

/// Compresses `body` as one unit and appends the complete frame to `out`.
pub fn write_frame(
    compressor: &dyn Compressor,
    body: &[u8],
    out: &mut Vec<u8>,
) -> Result<(), ChwireError> {
    let start = out.len();
    out.extend_from_slice(&[0u8; CHECKSUM_SIZE]);
    out.push(compressor.method());
    out.extend_from_slice(&[0u8; 8]);

    if let Err(e) = compressor.compress(body, out) {
        out.truncate(start);
        return Err(e);
    }

    let compressed_size = out.len() - start - CHECKSUM_SIZE;
    let (compressed_size, decompressed_size) =
        match (u32::try_from(compressed_size), u32::try_from(body.len())) {
            (Ok(c), Ok(d)) => (c, d),
            _ => {
                out.truncate(start);
                return Err(ChwireError::Compression(format!(
                    "block of {} bytes does not fit a single frame",
                    body.len()
                )));
            }
        };

    let sizes = start + CHECKSUM_SIZE + 1;
    out[sizes..sizes + 4].copy_from_slice(&compressed_size.to_le_bytes());
    out[sizes + 4..sizes + 8].copy_from_slice(&decompressed_size.to_le_bytes());

    let sum = checksum::frame_checksum(&out[start + CHECKSUM_SIZE..]);
    out[start..start + CHECKSUM_SIZE].copy_from_slice(&checksum::to_wire(sum));

    log::trace!(
        "frame written: method={:#04x} compressed={} decompressed={}",
        compressor.method(),
        compressed_size,
        decompressed_size
    );
    Ok(())
}

//==================================================================================
// Decoding
//==================================================================================

/// Reads one frame from `src`, validates it and appends the decompressed body to `out`.
///
/// `scratch` holds the compressed payload and is reused across frames.
pub fn read_frame<R: Read + ?Sized>(
    src: &mut R,
    max_frame_size: usize,
    scratch: &mut Vec<u8>,
    out: &mut Vec<u8>,
) -> Result<FrameHeader, ChwireError> {
    let mut raw = [0u8; CHECKSUM_SIZE + HEADER_SIZE];
    read_exact_from(src, &mut raw)?;
    let header = FrameHeader::parse(&raw);

    if (header.compressed_size as usize) < HEADER_SIZE {
        return Err(ChwireError::Decompression(format!(
            "compressed size {} is smaller than the frame header",
            header.compressed_size
        )));
    }
    if header.compressed_size as usize > max_frame_size
        || header.decompressed_size as usize > max_frame_size
    {
        return Err(ChwireError::Decompression(format!(
            "frame sizes {}/{} exceed the limit of {} bytes",
            header.compressed_size, header.decompressed_size, max_frame_size
        )));
    }

    scratch.clear();
    scratch.extend_from_slice(&raw[CHECKSUM_SIZE..]);
    let payload_start = scratch.len();
    scratch.resize(payload_start + header.payload_len(), 0);
    read_exact_from(src, &mut scratch[payload_start..])?;

    let actual = checksum::frame_checksum(scratch);
    if actual != header.checksum {
        return Err(ChwireError::Checksum {
            expected: header.checksum,
            actual,
        });
    }

    let decompressor = kernels::codec_for(header.method)?;
    decompressor.decompress(
        &scratch[payload_start..],
        header.decompressed_size as usize,
        out,
    )?;
    Ok(header)
}

pub(crate) fn read_exact_from<R: Read + ?Sized>(
    src: &mut R,
    buf: &mut [u8],
) -> Result<(), ChwireError> {
    src.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ChwireError::UnexpectedEof,
        _ => ChwireError::Io(e),
    })
}
