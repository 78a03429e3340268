// In: src/error.rs

//! This module defines the single, unified error type for the entire chwire library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Decode failures are always wrapped in [`ChwireError::Read`] together with the
//! identity of the decoding step, and encode failures in [`ChwireError::Write`].
//! None of these errors are retried inside the codec.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChwireError {
    // =========================================================================
    // === Step-Wrapped Errors (what call sites match on)
    // =========================================================================
    /// A truncated or structurally invalid decode, tagged with the step that failed.
    #[error("read {step}: {source}")]
    Read {
        step: String,
        #[source]
        source: Box<ChwireError>,
    },

    /// A write-side failure (including compression), tagged with the step that failed.
    #[error("write {step}: {source}")]
    Write {
        step: String,
        #[source]
        source: Box<ChwireError>,
    },

    #[error("column {name:?} from the block header was not found in the destination columns")]
    ColumnNotFound { name: String },

    #[error(
        "first column {first_column:?} has {first_count} rows but column {column:?} has {count} rows"
    )]
    RowCountMismatch {
        first_column: String,
        first_count: usize,
        column: String,
        count: usize,
    },

    #[error("unsupported protocol feature: {0}")]
    UnsupportedFeature(String),

    // =========================================================================
    // === Low-Level Codec Errors
    // =========================================================================
    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("varint decoding error: {0}")]
    VarintDecode(String),

    #[error("byte string of {len} bytes exceeds the limit of {limit} bytes")]
    ByteStringTooLong { len: u64, limit: usize },

    #[error("checksum mismatch: expected {expected:#034x}, got {actual:#034x}")]
    Checksum { expected: u128, actual: u128 },

    #[error("unknown compression method byte {0:#04x}")]
    UnknownCompressionMethod(u8),

    #[error("compression failed: {0}")]
    Compression(String),

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("invalid column type {0:?}")]
    InvalidType(String),

    #[error("column type mismatch: column decodes {expected:?} but the block declares {actual:?}")]
    TypeMismatch { expected: String, actual: String },

    #[error("invalid column {column:?}: {reason}")]
    Validation { column: String, reason: String },

    #[error("cannot append value: {0}")]
    AppendValue(String),

    #[error("insert requires at least one column")]
    NoColumns,

    #[error("invalid block state: {0}")]
    InvalidState(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while loading a `WireConfig`.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl ChwireError {
    /// Wraps `cause` as a decode failure of `step`.
    pub fn read(step: impl Into<String>, cause: ChwireError) -> Self {
        ChwireError::Read {
            step: step.into(),
            source: Box::new(cause),
        }
    }

    /// Wraps `cause` as an encode failure of `step`.
    pub fn write(step: impl Into<String>, cause: ChwireError) -> Self {
        ChwireError::Write {
            step: step.into(),
            source: Box::new(cause),
        }
    }

    /// Returns the innermost error, skipping any `Read`/`Write` step wrappers.
    pub fn root_cause(&self) -> &ChwireError {
        match self {
            ChwireError::Read { source, .. } | ChwireError::Write { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_wrapping_renders_step_and_cause() {
        let err = ChwireError::read("blockInfo: read bucketNum", ChwireError::UnexpectedEof);
        assert_eq!(
            err.to_string(),
            "read blockInfo: read bucketNum: unexpected end of stream"
        );
        assert!(matches!(err.root_cause(), ChwireError::UnexpectedEof));
    }

    #[test]
    fn test_row_count_mismatch_message_names_both_columns() {
        let err = ChwireError::RowCountMismatch {
            first_column: "a".into(),
            first_count: 3,
            column: "b".into(),
            count: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("\"a\" has 3 rows"));
        assert!(msg.contains("\"b\" has 2 rows"));
    }
}
