//! `Array(T)`: one cumulative `u64` end offset per row, then the flattened
//! inner column holding every element of every row. The inner column can be
//! another array, so nesting depth is unbounded.

use crate::column::{append_items_or_none, invalid, value_mismatch, Column, ColumnBasic, ColumnHeader};
use crate::cursor::{Reader, Writer};
use crate::error::ChwireError;
use crate::types::{ChType, Value};
use crate::utils::{check_offsets, extend_le_u64, last_offset, offset_range, read_offsets};

#[derive(Debug)]
pub struct Array<C: ColumnBasic> {
    header: ColumnHeader,
    offsets: Vec<u64>,
    inner: C,
    raw: Vec<u8>,
}

impl<C: ColumnBasic> Array<C> {
    pub fn new(inner: C) -> Self {
        Self {
            header: ColumnHeader::default(),
            offsets: Vec::new(),
            inner,
            raw: Vec::new(),
        }
    }

    /// Starts a row of `len` elements. The caller appends the elements to
    /// [`Array::inner_mut`] itself.
    pub fn append_len(&mut self, len: usize) {
        let last = last_offset(&self.offsets);
        self.offsets.push(last + len as u64);
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

impl<C: ColumnBasic> ColumnBasic for Array<C> {
    fn header(&self) -> &ColumnHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ColumnHeader {
        &mut self.header
    }

    fn ch_type(&self) -> ChType {
        ChType::Array(Box::new(self.inner.ch_type()))
    }

    fn num_row(&self) -> usize {
        self.offsets.len()
    }

    fn append_empty(&mut self) {
        self.append_len(0);
    }

    fn append_any(&mut self, value: &Value) -> Result<(), ChwireError> {
        let Value::Array(items) = value else {
            return Err(value_mismatch(&self.ch_type(), value));
        };
        append_items_or_none(&mut self.inner, items)?;
        self.append_len(items.len());
        Ok(())
    }

    fn remove_last(&mut self) {
        let Some(end) = self.offsets.pop() else {
            return;
        };
        let start = last_offset(&self.offsets);
        for _ in start..end {
            self.inner.remove_last();
        }
    }

    fn row_any(&self, row: usize) -> Value {
        Value::Array(
            offset_range(&self.offsets, row)
                .map(|i| self.inner.row_any(i))
                .collect(),
        )
    }

    fn read_prefix(&mut self, r: &mut Reader) -> Result<(), ChwireError> {
        self.inner.read_prefix(r)
    }

    fn write_prefix(&self, w: &mut Writer) {
        self.inner.write_prefix(w);
    }

    fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError> {
        read_offsets(r, num, &mut self.raw, &mut self.offsets)?;
        let total = usize::try_from(last_offset(&self.offsets))
            .map_err(|_| invalid("array element count overflows usize"))?;
        self.inner.read_raw(total, r)
    }

    fn write_to(&self, w: &mut Writer) {
        extend_le_u64(&self.offsets, &mut w.output);
        self.inner.write_to(w);
    }

    fn check_structure(&self) -> Result<(), ChwireError> {
        check_offsets(&self.offsets, self.inner.num_row()).map_err(invalid)?;
        self.inner.check_structure()
    }

    fn reset(&mut self) {
        self.offsets.clear();
        self.inner.reset();
    }

    fn to_json(
        &self,
        row: usize,
        ignore_double_quotes: bool,
        out: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        out.push(b'[');
        for (n, i) in offset_range(&self.offsets, row).enumerate() {
            if n > 0 {
                out.push(b',');
            }
            self.inner.to_json(i, ignore_double_quotes, out)?;
        }
        out.push(b']');
        Ok(())
    }
}

impl<C: Column> Column for Array<C> {
    type Value = Vec<C::Value>;

    fn append(&mut self, value: Vec<C::Value>) {
        self.append_len(value.len());
        for v in value {
            self.inner.append(v);
        }
    }

    fn row(&self, row: usize) -> Vec<C::Value> {
        offset_range(&self.offsets, row)
            .map(|i| self.inner.row(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::test_util::roundtrip;
    use crate::column::{Base, LowCardinality, Nullable, StringColumn};

    #[test]
    fn test_offsets_are_cumulative() {
        let mut col = Array::new(Base::<i16>::new());
        col.append(vec![1, 2]);
        col.append(vec![]);
        col.append(vec![3, 4, 5]);
        assert_eq!(col.offsets(), &[2, 2, 5]);
        assert_eq!(col.row(2), vec![3, 4, 5]);

        let mut w = Writer::new();
        col.write_to(&mut w);
        assert_eq!(w.output.len(), 3 * 8 + 5 * 2);
        assert_eq!(&w.output[8..16], &[2, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_triple_nested_roundtrip() {
        let make = || Array::new(Array::new(Array::new(Base::<i32>::new())));
        let mut col = make();
        col.append(vec![vec![vec![1, 2], vec![]], vec![vec![3]]]);
        col.append(vec![]);
        col.append(vec![vec![], vec![vec![4, 5, 6]]]);
        let back = roundtrip(&col, make());
        assert_eq!(back.data(), col.data());
        assert_eq!(
            back.type_name(),
            b"Array(Array(Array(Int32)))".to_vec()
        );
    }

    #[test]
    fn test_nested_composites_roundtrip() {
        let make = || Array::new(Nullable::new(StringColumn::new()));
        let mut col = make();
        col.append(vec![Some(b"a".to_vec()), None]);
        col.append(vec![None]);
        let back = roundtrip(&col, make());
        assert_eq!(back.data(), col.data());

        // The low cardinality prefix travels through the array.
        let make = || Array::new(LowCardinality::new(StringColumn::new()));
        let mut col = make();
        col.append(vec![b"x".to_vec(), b"y".to_vec(), b"x".to_vec()]);
        col.append(vec![]);
        let back = roundtrip(&col, make());
        assert_eq!(back.data(), col.data());
    }

    #[test]
    fn test_decreasing_offsets_are_rejected() {
        let mut w = Writer::new();
        w.uint64(3);
        w.uint64(1);
        let mut r = Reader::new(std::io::Cursor::new(w.output));
        let mut col = Array::new(Base::<u8>::new());
        assert!(col.read_raw(2, &mut r).is_err());
    }

    #[test]
    fn test_manual_rows_and_rollback() {
        let mut col = Array::new(Base::<u8>::new());
        col.append_len(2);
        col.inner_mut().append_multi([7, 8]);
        assert!(col.check_structure().is_ok());

        let bad = Value::Array(vec![Value::UInt8(1), Value::Int8(2)]);
        assert!(col.append_any(&bad).is_err());
        assert_eq!(col.inner().num_row(), 2);

        col.append_any(&Value::Array(vec![Value::UInt8(9)])).unwrap();
        col.remove_last();
        assert_eq!(col.data(), vec![vec![7, 8]]);
        assert_eq!(col.row_any(0), Value::Array(vec![Value::UInt8(7), Value::UInt8(8)]));

        col.append_len(1);
        assert!(col.check_structure().is_err());
    }
}
