//! The read half of the byte cursor.
//!
//! A `Reader` decodes protocol primitives from a blocking transport. With
//! compression switched on it pulls whole frames, decompresses them into an
//! internal buffer and serves bytes from there. Switching compression off does
//! not drop the undelivered remainder of the current frame: the next time it
//! is switched on, reading resumes where it stopped.

use std::io::Read;

use super::frame;
use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::error::ChwireError;
use crate::kernels::leb128;

/// A reasonable limit to prevent OOM from malformed string lengths. (16MB)
pub const MAX_BYTE_STRING_LEN: usize = 16 * 1024 * 1024;

/// Large bulk reads grow the destination in steps of this size, so a hostile
/// row count cannot force one huge allocation ahead of the data arriving.
const READ_CHUNK: usize = 64 * 1024;

pub struct Reader {
    inner: Box<dyn Read + Send>,
    compress: bool,
    decompressed: Vec<u8>,
    pos: usize,
    frame_scratch: Vec<u8>,
    max_frame_size: usize,
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("compress", &self.compress)
            .field("buffered", &(self.decompressed.len() - self.pos))
            .finish()
    }
}

impl Reader {
    pub fn new<R: Read + Send + 'static>(inner: R) -> Self {
        Self {
            inner: Box::new(inner),
            compress: false,
            decompressed: Vec::new(),
            pos: 0,
            frame_scratch: Vec::new(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Upper bound on either size field of an incoming frame.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.max_frame_size = max_frame_size;
    }

    /// Toggles the compression boundary.
    pub fn set_compress(&mut self, compress: bool) {
        self.compress = compress;
    }

    pub fn is_compress(&self) -> bool {
        self.compress
    }

    /// Bytes of the current decompressed frame not yet consumed.
    pub fn buffered(&self) -> usize {
        self.decompressed.len() - self.pos
    }

    fn next_frame(&mut self) -> Result<(), ChwireError> {
        self.decompressed.clear();
        self.pos = 0;
        let header = frame::read_frame(
            &mut self.inner,
            self.max_frame_size,
            &mut self.frame_scratch,
            &mut self.decompressed,
        )?;
        log::trace!(
            "frame read: method={:#04x} decompressed={}",
            header.method,
            header.decompressed_size
        );
        Ok(())
    }

    /// Fills `buf` completely or fails with `UnexpectedEof`.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), ChwireError> {
        if !self.compress {
            return frame::read_exact_from(&mut self.inner, buf);
        }
        let mut filled = 0;
        while filled < buf.len() {
            if self.pos == self.decompressed.len() {
                self.next_frame()?;
                continue;
            }
            let n = (buf.len() - filled).min(self.decompressed.len() - self.pos);
            buf[filled..filled + n].copy_from_slice(&self.decompressed[self.pos..self.pos + n]);
            self.pos += n;
            filled += n;
        }
        Ok(())
    }

    /// Appends exactly `n` bytes to `dst`.
    pub fn read_into(&mut self, dst: &mut Vec<u8>, n: usize) -> Result<(), ChwireError> {
        let mut remaining = n;
        while remaining > 0 {
            let chunk = remaining.min(READ_CHUNK);
            let start = dst.len();
            dst.resize(start + chunk, 0);
            self.read_exact(&mut dst[start..])?;
            remaining -= chunk;
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, ChwireError> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    pub fn uvarint(&mut self) -> Result<u64, ChwireError> {
        leb128::decode_from(|| self.read_byte())
    }

    /// Reads a varint length prefix and that many bytes.
    pub fn byte_string(&mut self) -> Result<Vec<u8>, ChwireError> {
        let len = self.uvarint()?;
        if len > MAX_BYTE_STRING_LEN as u64 {
            return Err(ChwireError::ByteStringTooLong {
                len,
                limit: MAX_BYTE_STRING_LEN,
            });
        }
        let mut out = vec![0u8; len as usize];
        self.read_exact(&mut out)?;
        Ok(out)
    }

    pub fn int32(&mut self) -> Result<i32, ChwireError> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(i32::from_le_bytes(b))
    }

    pub fn uint32(&mut self) -> Result<u32, ChwireError> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    pub fn uint64(&mut self) -> Result<u64, ChwireError> {
        let mut b = [0u8; 8];
        self.read_exact(&mut b)?;
        Ok(u64::from_le_bytes(b))
    }

    pub fn int64(&mut self) -> Result<i64, ChwireError> {
        let mut b = [0u8; 8];
        self.read_exact(&mut b)?;
        Ok(i64::from_le_bytes(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Writer;
    use crate::kernels::Lz4Codec;
    use std::io::Cursor;

    #[test]
    fn test_plain_primitives_roundtrip() {
        let mut w = Writer::new();
        w.uvarint(1 << 40);
        w.string("column");
        w.int32(-5);
        w.uint64(u64::MAX);

        let mut r = Reader::new(Cursor::new(w.output));
        assert_eq!(r.uvarint().unwrap(), 1 << 40);
        assert_eq!(r.byte_string().unwrap(), b"column");
        assert_eq!(r.int32().unwrap(), -5);
        assert_eq!(r.uint64().unwrap(), u64::MAX);
        assert!(matches!(r.read_byte(), Err(ChwireError::UnexpectedEof)));
    }

    #[test]
    fn test_compressed_remainder_survives_toggle() {
        let mut body = Writer::new();
        body.uvarint(42);
        body.string("after toggle");

        let mut w = Writer::new();
        w.string("");
        w.compress(&Lz4Codec, &body.output).unwrap();

        let mut r = Reader::new(Cursor::new(w.output));
        assert_eq!(r.byte_string().unwrap(), b"");
        r.set_compress(true);
        assert_eq!(r.uvarint().unwrap(), 42);
        r.set_compress(false);
        assert!(r.buffered() > 0);
        r.set_compress(true);
        assert_eq!(r.byte_string().unwrap(), b"after toggle");
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn test_read_spanning_frames() {
        let mut w = Writer::new();
        w.compress(&Lz4Codec, &[1, 2, 3]).unwrap();
        w.compress(&Lz4Codec, &[4, 5]).unwrap();

        let mut r = Reader::new(Cursor::new(w.output));
        r.set_compress(true);
        let mut out = Vec::new();
        r.read_into(&mut out, 5).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_byte_string_limit() {
        let mut w = Writer::new();
        w.uvarint(MAX_BYTE_STRING_LEN as u64 + 1);
        let mut r = Reader::new(Cursor::new(w.output));
        assert!(matches!(
            r.byte_string(),
            Err(ChwireError::ByteStringTooLong { .. })
        ));
    }
}
