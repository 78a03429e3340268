//! The byte cursor: protocol primitives over a growable buffer (write path)
//! or a blocking transport (read path), plus the compression framing.

pub mod frame;
mod reader;
mod writer;

pub use reader::{Reader, MAX_BYTE_STRING_LEN};
pub use writer::Writer;
