//! Boxed columns, as produced by [`crate::column::new_column`]. A boxed column
//! is itself a column whose row type is [`Value`], so it can sit inside any
//! typed composite.

use crate::column::{Column, ColumnBasic, ColumnHeader};
use crate::cursor::{Reader, Writer};
use crate::error::ChwireError;
use crate::types::{ChType, Value};

impl ColumnBasic for Box<dyn ColumnBasic> {
    fn header(&self) -> &ColumnHeader {
        (**self).header()
    }

    fn header_mut(&mut self) -> &mut ColumnHeader {
        (**self).header_mut()
    }

    fn ch_type(&self) -> ChType {
        (**self).ch_type()
    }

    fn num_row(&self) -> usize {
        (**self).num_row()
    }

    fn append_empty(&mut self) {
        (**self).append_empty()
    }

    fn append_any(&mut self, value: &Value) -> Result<(), ChwireError> {
        (**self).append_any(value)
    }

    fn remove_last(&mut self) {
        (**self).remove_last()
    }

    fn row_any(&self, row: usize) -> Value {
        (**self).row_any(row)
    }

    fn read_prefix(&mut self, r: &mut Reader) -> Result<(), ChwireError> {
        (**self).read_prefix(r)
    }

    fn write_prefix(&self, w: &mut Writer) {
        (**self).write_prefix(w)
    }

    fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError> {
        (**self).read_raw(num, r)
    }

    fn write_to(&self, w: &mut Writer) {
        (**self).write_to(w)
    }

    fn check_structure(&self) -> Result<(), ChwireError> {
        (**self).check_structure()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn is_nullable(&self) -> bool {
        (**self).is_nullable()
    }

    fn is_low_cardinality(&self) -> bool {
        (**self).is_low_cardinality()
    }

    fn to_json(
        &self,
        row: usize,
        ignore_double_quotes: bool,
        out: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        (**self).to_json(row, ignore_double_quotes, out)
    }
}

impl Column for Box<dyn ColumnBasic> {
    type Value = Value;

    /// A value of the wrong shape is logged and replaced by the default.
    fn append(&mut self, value: Value) {
        if let Err(e) = self.append_any(&value) {
            log::warn!(
                "column {:?}: {}; storing default",
                String::from_utf8_lossy(self.name()),
                e
            );
            self.append_empty();
        }
    }

    fn row(&self, row: usize) -> Value {
        self.row_any(row)
    }
}
