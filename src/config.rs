// In: src/config.rs

//! The single source of truth for codec configuration.
//!
//! `WireConfig` is created once at the connection boundary (from defaults or a
//! JSON document) after the protocol revision has been negotiated, and is then
//! passed by reference into every `Block` call made on that connection.

use serde::{Deserialize, Serialize};

use crate::error::ChwireError;

//==================================================================================
// I. Protocol Constants
//==================================================================================

/// First protocol revision whose column headers carry a custom-serialization byte.
pub const DBMS_MIN_PROTOCOL_WITH_CUSTOM_SERIALIZATION: u64 = 54454;

/// The revision this client announces when nothing else was negotiated.
pub const DEFAULT_PROTOCOL_REVISION: u64 = 54460;

/// Upper bound for a single compressed frame, in bytes (1 GiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1 << 30;

//==================================================================================
// II. Configuration Enums & Structs
//==================================================================================

/// Which compression capability wraps block bodies on the write path.
/// The read path always follows the method byte of each incoming frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMethod {
    /// **Default:** blocks are sent without a compression boundary.
    #[default]
    None,
    /// Raw LZ4 blocks. Fast, and what most servers default to.
    Lz4,
    /// Zstandard at `WireConfig::zstd_level`.
    Zstd,
}

/// Per-connection codec settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WireConfig {
    /// Compression applied to outgoing block bodies.
    #[serde(default)]
    pub compression: CompressionMethod,

    /// Zstd level, only used when `compression` is `Zstd`.
    #[serde(default = "default_zstd_level")]
    pub zstd_level: i32,

    /// The negotiated server protocol revision.
    #[serde(default = "default_protocol_revision")]
    pub protocol_revision: u64,

    /// If false (and compression is off), the writer is flushed after every
    /// column instead of buffering the whole block.
    #[serde(default = "default_true")]
    pub use_write_buffer: bool,

    /// Whether callers should ask `read_columns_data` to validate declared types.
    #[serde(default = "default_true")]
    pub validate_data: bool,

    /// Frames declaring a larger compressed or decompressed size are rejected.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::default(),
            zstd_level: default_zstd_level(),
            protocol_revision: default_protocol_revision(),
            use_write_buffer: true,
            validate_data: true,
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl WireConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ChwireError> {
        Ok(serde_json::from_str(json)?)
    }

    /// True when block bodies sit behind a compression boundary.
    pub fn is_compressed(&self) -> bool {
        self.compression != CompressionMethod::None
    }

    /// True when column headers carry the custom-serialization byte.
    pub fn has_custom_serialization_flag(&self) -> bool {
        self.protocol_revision >= DBMS_MIN_PROTOCOL_WITH_CUSTOM_SERIALIZATION
    }
}

fn default_true() -> bool {
    true
}

fn default_zstd_level() -> i32 {
    1
}

fn default_protocol_revision() -> u64 {
    DEFAULT_PROTOCOL_REVISION
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_fills_defaults() {
        let config = WireConfig::from_json(r#"{"compression": "lz4"}"#).unwrap();
        assert_eq!(config.compression, CompressionMethod::Lz4);
        assert!(config.is_compressed());
        assert_eq!(config.protocol_revision, DEFAULT_PROTOCOL_REVISION);
        assert!(config.use_write_buffer);
        assert!(config.has_custom_serialization_flag());
    }

    #[test]
    fn test_old_revision_has_no_custom_serialization_flag() {
        let config = WireConfig::from_json(r#"{"protocol_revision": 54453}"#).unwrap();
        assert!(!config.has_custom_serialization_flag());
        assert!(!config.is_compressed());
    }

    #[test]
    fn test_rejects_unknown_method() {
        assert!(WireConfig::from_json(r#"{"compression": "brotli"}"#).is_err());
    }
}
