//! `Nullable(T)`: a one-byte null mask per row followed by the full inner
//! column. Null rows still occupy a placeholder slot in the inner column, so
//! the mask and the inner column always have the same length.

use crate::column::{invalid, Column, ColumnBasic, ColumnHeader};
use crate::cursor::{Reader, Writer};
use crate::error::ChwireError;
use crate::types::{ChType, Value};

#[derive(Debug)]
pub struct Nullable<C: ColumnBasic> {
    header: ColumnHeader,
    mask: Vec<u8>,
    inner: C,
}

impl<C: ColumnBasic> Nullable<C> {
    pub fn new(inner: C) -> Self {
        Self {
            header: ColumnHeader::default(),
            mask: Vec::new(),
            inner,
        }
    }

    /// Appends a NULL: mask byte 1 and a default placeholder in the inner column.
    pub fn append_nil(&mut self) {
        self.mask.push(1);
        self.inner.append_empty();
    }

    pub fn value_is_nil(&self, row: usize) -> bool {
        self.mask[row] == 1
    }

    /// The null mask, one byte per row.
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

impl<C: Column> Nullable<C> {
    /// Same as `append`, kept for the pointer-style call sites.
    pub fn append_p(&mut self, value: Option<C::Value>) {
        self.append(value);
    }

    pub fn row_p(&self, row: usize) -> Option<C::Value> {
        self.row(row)
    }
}

impl<C: ColumnBasic> ColumnBasic for Nullable<C> {
    fn header(&self) -> &ColumnHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ColumnHeader {
        &mut self.header
    }

    fn ch_type(&self) -> ChType {
        ChType::Nullable(Box::new(self.inner.ch_type()))
    }

    fn num_row(&self) -> usize {
        self.mask.len()
    }

    /// The default of a nullable type is NULL.
    fn append_empty(&mut self) {
        self.append_nil();
    }

    fn append_any(&mut self, value: &Value) -> Result<(), ChwireError> {
        if value.is_null() {
            self.append_nil();
        } else {
            self.inner.append_any(value)?;
            self.mask.push(0);
        }
        Ok(())
    }

    fn remove_last(&mut self) {
        if self.mask.pop().is_some() {
            self.inner.remove_last();
        }
    }

    fn row_any(&self, row: usize) -> Value {
        if self.value_is_nil(row) {
            Value::Null
        } else {
            self.inner.row_any(row)
        }
    }

    fn read_prefix(&mut self, r: &mut Reader) -> Result<(), ChwireError> {
        self.inner.read_prefix(r)
    }

    fn write_prefix(&self, w: &mut Writer) {
        self.inner.write_prefix(w);
    }

    fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError> {
        self.mask.clear();
        r.read_into(&mut self.mask, num)?;
        if let Some(pos) = self.mask.iter().position(|&b| b > 1) {
            return Err(invalid(format!(
                "null mask byte {} at row {}",
                self.mask[pos], pos
            )));
        }
        // The inner column is always present, whatever the mask says.
        self.inner.read_raw(num, r)
    }

    fn write_to(&self, w: &mut Writer) {
        w.raw(&self.mask);
        self.inner.write_to(w);
    }

    fn check_structure(&self) -> Result<(), ChwireError> {
        if self.mask.len() != self.inner.num_row() {
            return Err(invalid(format!(
                "null mask has {} rows but the inner column has {}",
                self.mask.len(),
                self.inner.num_row()
            )));
        }
        self.inner.check_structure()
    }

    fn reset(&mut self) {
        self.mask.clear();
        self.inner.reset();
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn to_json(
        &self,
        row: usize,
        ignore_double_quotes: bool,
        out: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        if self.value_is_nil(row) {
            out.extend_from_slice(b"null");
            return Ok(());
        }
        self.inner.to_json(row, ignore_double_quotes, out)
    }
}

impl<C: Column> Column for Nullable<C> {
    type Value = Option<C::Value>;

    fn append(&mut self, value: Option<C::Value>) {
        match value {
            Some(v) => {
                self.mask.push(0);
                self.inner.append(v);
            }
            None => self.append_nil(),
        }
    }

    fn row(&self, row: usize) -> Option<C::Value> {
        if self.value_is_nil(row) {
            None
        } else {
            Some(self.inner.row(row))
        }
    }
}
