//! The fixed-layout `BlockInfo` section that opens every block body.
//!
//! Fields are strictly positional: `varint(1)`, `u8 is_overflows`, `varint(2)`,
//! `i32 bucket_num`, `varint(0)`. The field numbers are written as constants
//! and read back without interpretation.

use crate::cursor::{Reader, Writer};
use crate::error::ChwireError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub field1: u64,
    pub is_overflows: u8,
    pub field2: u64,
    /// `-1` means "not bucketed". Zero is never sent.
    pub bucket_num: i32,
    pub num3: u64,
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self {
            field1: 1,
            is_overflows: 0,
            field2: 2,
            bucket_num: -1,
            num3: 0,
        }
    }
}

impl BlockInfo {
    pub fn read(r: &mut Reader) -> Result<Self, ChwireError> {
        let field1 = r
            .uvarint()
            .map_err(|e| ChwireError::read("blockInfo: read field1", e))?;
        let is_overflows = r
            .read_byte()
            .map_err(|e| ChwireError::read("blockInfo: read isOverflows", e))?;
        let field2 = r
            .uvarint()
            .map_err(|e| ChwireError::read("blockInfo: read field2", e))?;
        let bucket_num = r
            .int32()
            .map_err(|e| ChwireError::read("blockInfo: read bucketNum", e))?;
        let num3 = r
            .uvarint()
            .map_err(|e| ChwireError::read("blockInfo: read num3", e))?;
        Ok(Self {
            field1,
            is_overflows,
            field2,
            bucket_num,
            num3,
        })
    }

    /// Writes the section. A `bucket_num` of zero goes out as `-1`.
    pub fn write(&self, w: &mut Writer) {
        w.uvarint(1);
        w.uint8(self.is_overflows);
        w.uvarint(2);
        w.int32(if self.bucket_num == 0 { -1 } else { self.bucket_num });
        w.uvarint(0);
    }
}
