//! This module contains the typed column family: one in-memory container per
//! wire type, each able to append rows, decode a block's worth of rows from a
//! [`Reader`] and encode itself into a [`Writer`].
//!
//! Two traits split the surface:
//! - [`ColumnBasic`] is object-safe and is what the block codec drives. It
//!   carries the column's name, declared type and the wire operations.
//! - [`Column`] adds the typed row API (`append`/`row`) on top.
//!
//! Composite columns (`Nullable`, `Array`, `Map`, tuples, `LowCardinality`)
//! own their children and delegate to them, so types nest to any depth.

use crate::config::DBMS_MIN_PROTOCOL_WITH_CUSTOM_SERIALIZATION;
use crate::cursor::{Reader, Writer};
use crate::error::ChwireError;
use crate::types::{ChType, Value};

pub mod array;
pub mod base;
mod dynamic;
mod factory;
mod json;
pub mod low_cardinality;
pub mod map;
pub mod nullable;
pub mod string;
pub mod tuple;

pub use array::Array;
pub use base::{Base, Primitive};
pub use factory::{column_for_type, new_column};
pub use low_cardinality::LowCardinality;
pub use map::Map;
pub use nullable::Nullable;
pub use string::{FixedString, StringColumn};
pub use tuple::{Tuple, Tuple2, Tuple3, Tuple4, Tuple5};

//==================================================================================
// 1. Column Header
//==================================================================================

/// The name and declared type of one column, as carried in a block header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnHeader {
    pub name: Vec<u8>,
    pub ch_type: Vec<u8>,
}

impl ColumnHeader {
    pub fn new(name: impl Into<Vec<u8>>, ch_type: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            ch_type: ch_type.into(),
        }
    }

    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    pub fn type_str(&self) -> String {
        String::from_utf8_lossy(&self.ch_type).into_owned()
    }

    /// Reads `name`, `type` and, on revisions that carry it, the custom
    /// serialization flag. A set flag is rejected.
    pub fn read(r: &mut Reader, revision: u64) -> Result<Self, ChwireError> {
        let name = r
            .byte_string()
            .map_err(|e| ChwireError::read("block: read column name", e))?;
        let ch_type = r
            .byte_string()
            .map_err(|e| ChwireError::read("block: read column type", e))?;
        if revision >= DBMS_MIN_PROTOCOL_WITH_CUSTOM_SERIALIZATION {
            let flag = r
                .read_byte()
                .map_err(|e| ChwireError::read("block: read custom serialization", e))?;
            if flag != 0 {
                return Err(ChwireError::read(
                    "block: read custom serialization",
                    ChwireError::UnsupportedFeature(format!(
                        "custom serialization (flag {}) for column {:?}",
                        flag,
                        String::from_utf8_lossy(&name)
                    )),
                ));
            }
        }
        Ok(Self { name, ch_type })
    }

    pub fn write(&self, w: &mut Writer, revision: u64) {
        w.byte_string(&self.name);
        w.byte_string(&self.ch_type);
        if revision >= DBMS_MIN_PROTOCOL_WITH_CUSTOM_SERIALIZATION {
            w.uint8(0);
        }
    }
}

//==================================================================================
// 2. Core Traits
//==================================================================================

/// The object-safe contract every column implements.
pub trait ColumnBasic: Send {
    fn header(&self) -> &ColumnHeader;

    fn header_mut(&mut self) -> &mut ColumnHeader;

    /// The structural type this column decodes, e.g. `Array(Nullable(Int32))`.
    fn ch_type(&self) -> ChType;

    fn num_row(&self) -> usize;

    /// Appends the type's default value (zero, empty, or NULL for nullable types).
    fn append_empty(&mut self);

    /// Appends a dynamic value. On error nothing is appended.
    fn append_any(&mut self, value: &Value) -> Result<(), ChwireError>;

    /// Drops the last row. No-op on an empty column.
    fn remove_last(&mut self);

    /// Returns row `row` as a dynamic value. Panics if `row` is out of range.
    fn row_any(&self, row: usize) -> Value;

    /// Reads the type-specific prefix that precedes the column body.
    /// Most types have none.
    fn read_prefix(&mut self, _r: &mut Reader) -> Result<(), ChwireError> {
        Ok(())
    }

    /// Writes the prefix read by [`ColumnBasic::read_prefix`].
    fn write_prefix(&self, _w: &mut Writer) {}

    /// Decodes exactly `num` rows, replacing the current contents.
    fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError>;

    /// Encodes every buffered row.
    fn write_to(&self, w: &mut Writer);

    /// Internal consistency of the buffered data (offsets, masks, keys).
    fn check_structure(&self) -> Result<(), ChwireError> {
        Ok(())
    }

    /// Clears all rows. The name and declared type are kept.
    fn reset(&mut self);

    fn is_nullable(&self) -> bool {
        false
    }

    fn is_low_cardinality(&self) -> bool {
        false
    }

    /// Appends row `row` as JSON text to `out`. With `ignore_double_quotes`
    /// string values are escaped but left unquoted.
    fn to_json(
        &self,
        row: usize,
        ignore_double_quotes: bool,
        out: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        json::append_value(&self.row_any(row), ignore_double_quotes, out)
    }

    //------------------------------------------------------------------------------
    // Provided operations
    //------------------------------------------------------------------------------

    fn name(&self) -> &[u8] {
        &self.header().name
    }

    fn set_name(&mut self, name: &[u8]) {
        self.header_mut().name = name.to_vec();
    }

    /// The declared type: read from the wire or set by the caller. Falls back
    /// to the structural type when neither happened.
    fn type_name(&self) -> Vec<u8> {
        let declared = &self.header().ch_type;
        if declared.is_empty() {
            self.ch_type().to_string().into_bytes()
        } else {
            declared.clone()
        }
    }

    fn set_type(&mut self, ch_type: &[u8]) {
        self.header_mut().ch_type = ch_type.to_vec();
    }

    /// Reads the column header (when `read_column`) and then the prefix.
    fn header_reader(
        &mut self,
        r: &mut Reader,
        read_column: bool,
        revision: u64,
    ) -> Result<(), ChwireError> {
        if read_column {
            *self.header_mut() = ColumnHeader::read(r, revision)?;
        }
        self.read_prefix(r)
            .map_err(|e| ChwireError::read("column header: read prefix", e))
    }

    fn header_writer(&self, w: &mut Writer) {
        self.write_prefix(w);
    }

    /// Checks the declared type against what this column decodes, then the
    /// buffered data.
    fn validate(&self) -> Result<(), ChwireError> {
        let declared = &self.header().ch_type;
        if !declared.is_empty() {
            let text = String::from_utf8_lossy(declared);
            let actual = ChType::parse(&text)?;
            let expected = self.ch_type();
            if !expected.is_compatible(&actual) {
                return Err(ChwireError::TypeMismatch {
                    expected: expected.to_string(),
                    actual: text.into_owned(),
                });
            }
        }
        self.check_structure()
            .map_err(|e| with_column_name(e, &self.header().name_str()))
    }
}

/// The typed row API.
pub trait Column: ColumnBasic {
    type Value;

    fn append(&mut self, value: Self::Value);

    /// Returns row `row`. Panics if `row` is out of range.
    fn row(&self, row: usize) -> Self::Value;

    fn append_multi<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = Self::Value>,
        Self: Sized,
    {
        for v in values {
            self.append(v);
        }
    }

    /// Every buffered row, copied out.
    fn data(&self) -> Vec<Self::Value> {
        (0..self.num_row()).map(|i| self.row(i)).collect()
    }

    /// Appends every buffered row to `out`.
    fn read_all(&self, out: &mut Vec<Self::Value>) {
        out.extend((0..self.num_row()).map(|i| self.row(i)));
    }
}

//==================================================================================
// 3. Shared Helpers
//==================================================================================

/// Builds the structural-consistency error for a column.
pub(crate) fn invalid(reason: impl Into<String>) -> ChwireError {
    ChwireError::Validation {
        column: String::new(),
        reason: reason.into(),
    }
}

/// Fills in `name` on a `Validation` error raised without one, looking through
/// step wrappers.
pub(crate) fn with_column_name(e: ChwireError, name: &str) -> ChwireError {
    match e {
        ChwireError::Validation { column, reason } if column.is_empty() => {
            ChwireError::Validation {
                column: name.to_string(),
                reason,
            }
        }
        ChwireError::Read { step, source } => ChwireError::Read {
            step,
            source: Box::new(with_column_name(*source, name)),
        },
        other => other,
    }
}

/// Builds the error for a dynamic value of the wrong shape.
pub(crate) fn value_mismatch(expected: &ChType, value: &Value) -> ChwireError {
    ChwireError::AppendValue(format!(
        "a {} value cannot be stored in a {} column",
        value.kind(),
        expected
    ))
}

/// Appends `items[i]` to `columns[i]` for every `i`, rolling back the columns
/// already appended to when one fails.
pub(crate) fn append_all_or_none(
    columns: &mut [&mut dyn ColumnBasic],
    items: &[Value],
) -> Result<(), ChwireError> {
    for i in 0..columns.len() {
        if let Err(e) = columns[i].append_any(&items[i]) {
            for done in columns[..i].iter_mut() {
                done.remove_last();
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Appends every item to one column, rolling back on failure.
pub(crate) fn append_items_or_none(
    column: &mut dyn ColumnBasic,
    items: &[Value],
) -> Result<(), ChwireError> {
    for (i, item) in items.iter().enumerate() {
        if let Err(e) = column.append_any(item) {
            for _ in 0..i {
                column.remove_last();
            }
            return Err(e);
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::config::DEFAULT_PROTOCOL_REVISION;

    /// Writes `src` as a full column (header, prefix, body), reads it back into
    /// `dst` and returns the decoded column.
    pub fn roundtrip<C: ColumnBasic>(src: &C, mut dst: C) -> C {
        let mut w = Writer::new();
        ColumnHeader::new(src.name(), src.type_name()).write(&mut w, DEFAULT_PROTOCOL_REVISION);
        src.header_writer(&mut w);
        src.write_to(&mut w);

        let mut r = Reader::new(std::io::Cursor::new(w.output));
        dst.header_reader(&mut r, true, DEFAULT_PROTOCOL_REVISION)
            .unwrap();
        dst.validate().unwrap();
        dst.read_raw(src.num_row(), &mut r).unwrap();
        assert_eq!(r.buffered(), 0);
        dst
    }
}
