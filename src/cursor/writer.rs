//! The write half of the byte cursor.
//!
//! A `Writer` accumulates protocol primitives into a growable buffer. Writers
//! built with a sink can `flush` that buffer to the transport; writers without
//! one keep everything in `output` for the caller to take.

use std::io::Write;

use super::frame;
use crate::error::ChwireError;
use crate::kernels::leb128;
use crate::traits::Compressor;

pub struct Writer {
    /// Bytes written since the last `flush`/`reset`.
    pub output: Vec<u8>,
    sink: Option<Box<dyn Write + Send>>,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("buffered", &self.output.len())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self {
            output: Vec::new(),
            sink: None,
        }
    }

    /// A writer whose `flush` forwards the buffered bytes to `sink`.
    pub fn with_sink<W: Write + Send + 'static>(sink: W) -> Self {
        Self {
            output: Vec::new(),
            sink: Some(Box::new(sink)),
        }
    }

    pub fn uvarint(&mut self, value: u64) {
        leb128::encode_u64(value, &mut self.output);
    }

    /// Varint length prefix followed by the raw bytes.
    pub fn byte_string(&mut self, bytes: &[u8]) {
        self.uvarint(bytes.len() as u64);
        self.output.extend_from_slice(bytes);
    }

    pub fn string(&mut self, s: &str) {
        self.byte_string(s.as_bytes());
    }

    pub fn uint8(&mut self, value: u8) {
        self.output.push(value);
    }

    pub fn int32(&mut self, value: i32) {
        self.output.extend_from_slice(&value.to_le_bytes());
    }

    pub fn uint32(&mut self, value: u32) {
        self.output.extend_from_slice(&value.to_le_bytes());
    }

    pub fn int64(&mut self, value: i64) {
        self.output.extend_from_slice(&value.to_le_bytes());
    }

    pub fn uint64(&mut self, value: u64) {
        self.output.extend_from_slice(&value.to_le_bytes());
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    /// Compresses `body` as a single frame and appends it to this writer.
    pub fn compress(&mut self, compressor: &dyn Compressor, body: &[u8]) -> Result<(), ChwireError> {
        frame::write_frame(compressor, body, &mut self.output)
    }

    /// Sends the buffered bytes to the sink. Without a sink this is a no-op
    /// and the bytes stay in `output`.
    pub fn flush(&mut self) -> Result<(), ChwireError> {
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(&self.output)?;
            sink.flush()?;
            self.output.clear();
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    /// Clears the buffer, keeping its allocation for the next block.
    pub fn reset(&mut self) {
        self.output.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_primitive_layout() {
        let mut w = Writer::new();
        w.uvarint(300);
        w.string("ab");
        w.int32(-1);
        w.uint8(7);
        assert_eq!(
            w.output,
            vec![0xAC, 0x02, 0x02, b'a', b'b', 0xFF, 0xFF, 0xFF, 0xFF, 0x07]
        );
    }

    #[test]
    fn test_flush_moves_bytes_to_sink() {
        let sink = SharedSink::default();
        let mut w = Writer::with_sink(sink.clone());
        w.string("hello");
        w.flush().unwrap();
        assert!(w.is_empty());
        assert_eq!(sink.0.lock().unwrap().as_slice(), b"\x05hello");
    }

    #[test]
    fn test_flush_without_sink_keeps_output() {
        let mut w = Writer::new();
        w.uint64(1);
        w.flush().unwrap();
        assert_eq!(w.len(), 8);
    }
}
