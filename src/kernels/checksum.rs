//! Frame checksum kernel.
//!
//! Every compressed frame starts with a CityHash128 (v1.0.2) of everything that
//! follows it: the method byte, both sizes and the payload. On the wire the two
//! 64-bit halves are stored low half first, each little-endian.

/// Computes the checksum of a frame body (method byte onward) in wire order.
pub fn frame_checksum(frame_body: &[u8]) -> u128 {
    let hash = cityhash_rs::cityhash_102_128(frame_body);
    hash << 64 | hash >> 64
}

/// Serializes a checksum into its 16 wire bytes.
pub fn to_wire(checksum: u128) -> [u8; 16] {
    checksum.to_le_bytes()
}

/// Parses the 16 wire bytes of a checksum.
pub fn from_wire(bytes: [u8; 16]) -> u128 {
    u128::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_deterministic_and_sensitive() {
        let a = frame_checksum(b"\x82\x0d\x00\x00\x00\x04\x00\x00\x00abcd");
        let b = frame_checksum(b"\x82\x0d\x00\x00\x00\x04\x00\x00\x00abcd");
        let c = frame_checksum(b"\x82\x0d\x00\x00\x00\x04\x00\x00\x00abce");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(from_wire(to_wire(a)), a);
    }
}
