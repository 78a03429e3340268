//! Variable-length and fixed-length byte string columns.
//!
//! `String` rows travel as length-prefixed byte strings. In memory they live in
//! one contiguous buffer with cumulative end offsets. `FixedString(N)` rows are
//! exactly `N` bytes each with no framing.

use crate::column::{json, value_mismatch, Column, ColumnBasic, ColumnHeader};
use crate::cursor::{Reader, Writer, MAX_BYTE_STRING_LEN};
use crate::error::ChwireError;
use crate::types::{ChType, Value};
use crate::utils::offset_range;

//==================================================================================
// 1. String
//==================================================================================

#[derive(Debug, Default)]
pub struct StringColumn {
    header: ColumnHeader,
    data: Vec<u8>,
    offsets: Vec<u64>,
}

impl StringColumn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
        self.offsets.push(self.data.len() as u64);
    }

    pub fn append_str(&mut self, value: &str) {
        self.append_bytes(value.as_bytes());
    }

    /// Borrows row `row` without copying.
    pub fn row_bytes(&self, row: usize) -> &[u8] {
        &self.data[offset_range(&self.offsets, row)]
    }

    /// Row `row` as UTF-8, replacing invalid sequences.
    pub fn row_string(&self, row: usize) -> String {
        String::from_utf8_lossy(self.row_bytes(row)).into_owned()
    }
}

impl ColumnBasic for StringColumn {
    fn header(&self) -> &ColumnHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ColumnHeader {
        &mut self.header
    }

    fn ch_type(&self) -> ChType {
        ChType::String
    }

    fn num_row(&self) -> usize {
        self.offsets.len()
    }

    fn append_empty(&mut self) {
        self.append_bytes(&[]);
    }

    fn append_any(&mut self, value: &Value) -> Result<(), ChwireError> {
        let bytes = value
            .as_bytes()
            .ok_or_else(|| value_mismatch(&ChType::String, value))?;
        self.append_bytes(bytes);
        Ok(())
    }

    fn remove_last(&mut self) {
        if self.offsets.pop().is_some() {
            let end = self.offsets.last().copied().unwrap_or(0) as usize;
            self.data.truncate(end);
        }
    }

    fn row_any(&self, row: usize) -> Value {
        Value::String(self.row_bytes(row).to_vec())
    }

    fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError> {
        self.data.clear();
        self.offsets.clear();
        self.offsets.reserve(num.min(1 << 16));
        for _ in 0..num {
            let len = r.uvarint()?;
            if len > MAX_BYTE_STRING_LEN as u64 {
                return Err(ChwireError::ByteStringTooLong {
                    len,
                    limit: MAX_BYTE_STRING_LEN,
                });
            }
            r.read_into(&mut self.data, len as usize)?;
            self.offsets.push(self.data.len() as u64);
        }
        Ok(())
    }

    fn write_to(&self, w: &mut Writer) {
        for row in 0..self.offsets.len() {
            w.byte_string(self.row_bytes(row));
        }
    }

    fn reset(&mut self) {
        self.data.clear();
        self.offsets.clear();
    }

    fn to_json(
        &self,
        row: usize,
        ignore_double_quotes: bool,
        out: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        json::append_string(self.row_bytes(row), ignore_double_quotes, out)
    }
}

impl Column for StringColumn {
    type Value = Vec<u8>;

    fn append(&mut self, value: Vec<u8>) {
        self.append_bytes(&value);
    }

    fn row(&self, row: usize) -> Vec<u8> {
        self.row_bytes(row).to_vec()
    }
}

//==================================================================================
// 2. FixedString(N)
//==================================================================================

#[derive(Debug)]
pub struct FixedString {
    header: ColumnHeader,
    size: usize,
    data: Vec<u8>,
}

impl FixedString {
    /// A column of `size`-byte rows. `size` must be non-zero.
    pub fn new(size: usize) -> Self {
        Self {
            header: ColumnHeader::default(),
            size: size.max(1),
            data: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Appends `value` zero-padded to the fixed width. Values longer than the
    /// width are rejected.
    pub fn append_bytes(&mut self, value: &[u8]) -> Result<(), ChwireError> {
        if value.len() > self.size {
            return Err(ChwireError::AppendValue(format!(
                "{} bytes do not fit FixedString({})",
                value.len(),
                self.size
            )));
        }
        self.data.extend_from_slice(value);
        self.data.resize(self.data.len() + self.size - value.len(), 0);
        Ok(())
    }

    pub fn row_bytes(&self, row: usize) -> &[u8] {
        &self.data[row * self.size..(row + 1) * self.size]
    }
}

impl ColumnBasic for FixedString {
    fn header(&self) -> &ColumnHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ColumnHeader {
        &mut self.header
    }

    fn ch_type(&self) -> ChType {
        ChType::FixedString(self.size)
    }

    fn num_row(&self) -> usize {
        self.data.len() / self.size
    }

    fn append_empty(&mut self) {
        self.data.resize(self.data.len() + self.size, 0);
    }

    fn append_any(&mut self, value: &Value) -> Result<(), ChwireError> {
        let bytes = value
            .as_bytes()
            .ok_or_else(|| value_mismatch(&self.ch_type(), value))?;
        self.append_bytes(bytes)
    }

    fn remove_last(&mut self) {
        let len = self.data.len().saturating_sub(self.size);
        self.data.truncate(len);
    }

    fn row_any(&self, row: usize) -> Value {
        Value::String(self.row_bytes(row).to_vec())
    }

    fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError> {
        self.data.clear();
        let len = num.checked_mul(self.size).ok_or_else(|| {
            ChwireError::UnsupportedFeature(format!("{} rows of {} bytes", num, self.size))
        })?;
        r.read_into(&mut self.data, len)
    }

    fn write_to(&self, w: &mut Writer) {
        w.raw(&self.data);
    }

    fn reset(&mut self) {
        self.data.clear();
    }

    fn to_json(
        &self,
        row: usize,
        ignore_double_quotes: bool,
        out: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        json::append_string(self.row_bytes(row), ignore_double_quotes, out)
    }
}

impl Column for FixedString {
    type Value = Vec<u8>;

    /// Oversized values are truncated to the fixed width.
    fn append(&mut self, mut value: Vec<u8>) {
        if value.len() > self.size {
            log::warn!(
                "truncating {}-byte value to FixedString({})",
                value.len(),
                self.size
            );
            value.truncate(self.size);
        }
        // Cannot fail once the value fits.
        let _ = self.append_bytes(&value);
    }

    fn row(&self, row: usize) -> Vec<u8> {
        self.row_bytes(row).to_vec()
    }
}
