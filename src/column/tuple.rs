//! `Tuple(T1, ..., Tn)`: each element column is encoded in full, one after the
//! other, with the same row count.
//!
//! [`Tuple2`]..[`Tuple5`] are statically typed and their row value is a Rust
//! tuple. [`Tuple`] holds any number of boxed element columns and works with
//! [`Value`]s.

use crate::column::{
    append_all_or_none, invalid, json, value_mismatch, Column, ColumnBasic, ColumnHeader,
};
use crate::cursor::{Reader, Writer};
use crate::error::ChwireError;
use crate::types::{ChType, Value};

//==================================================================================
// 1. Shared Element Plumbing
//==================================================================================

fn tuple_type(elements: &[&dyn ColumnBasic]) -> ChType {
    ChType::Tuple(elements.iter().map(|c| (None, c.ch_type())).collect())
}

fn append_tuple_any(
    ty: impl FnOnce() -> ChType,
    elements: &mut [&mut dyn ColumnBasic],
    value: &Value,
) -> Result<(), ChwireError> {
    match value {
        Value::Tuple(items) if items.len() == elements.len() => {
            append_all_or_none(elements, items)
        }
        _ => Err(value_mismatch(&ty(), value)),
    }
}

fn check_tuple(elements: &[&dyn ColumnBasic]) -> Result<(), ChwireError> {
    let rows = elements.first().map_or(0, |c| c.num_row());
    for (i, c) in elements.iter().enumerate() {
        if c.num_row() != rows {
            return Err(invalid(format!(
                "tuple element {} has {} rows but element 0 has {}",
                i,
                c.num_row(),
                rows
            )));
        }
        c.check_structure()?;
    }
    Ok(())
}

fn read_tuple(
    elements: &mut [&mut dyn ColumnBasic],
    num: usize,
    r: &mut Reader,
) -> Result<(), ChwireError> {
    for c in elements.iter_mut() {
        c.read_raw(num, r)?;
    }
    Ok(())
}

//==================================================================================
// 2. Statically Typed Tuples
//==================================================================================

macro_rules! impl_tuple {
    ($name:ident; $($C:ident $c:ident $idx:tt),+) => {
        #[derive(Debug)]
        pub struct $name<$($C: ColumnBasic),+> {
            header: ColumnHeader,
            columns: ($($C,)+),
        }

        impl<$($C: ColumnBasic),+> $name<$($C),+> {
            pub fn new($($c: $C),+) -> Self {
                Self {
                    header: ColumnHeader::default(),
                    columns: ($($c,)+),
                }
            }

            /// The element columns.
            pub fn columns(&self) -> &($($C,)+) {
                &self.columns
            }

            pub fn columns_mut(&mut self) -> &mut ($($C,)+) {
                &mut self.columns
            }

            fn elements(&self) -> Vec<&dyn ColumnBasic> {
                vec![$(&self.columns.$idx as &dyn ColumnBasic),+]
            }

            fn elements_mut(&mut self) -> Vec<&mut dyn ColumnBasic> {
                vec![$(&mut self.columns.$idx as &mut dyn ColumnBasic),+]
            }
        }

        impl<$($C: ColumnBasic),+> ColumnBasic for $name<$($C),+> {
            fn header(&self) -> &ColumnHeader {
                &self.header
            }

            fn header_mut(&mut self) -> &mut ColumnHeader {
                &mut self.header
            }

            fn ch_type(&self) -> ChType {
                tuple_type(&self.elements())
            }

            fn num_row(&self) -> usize {
                self.columns.0.num_row()
            }

            fn append_empty(&mut self) {
                $(self.columns.$idx.append_empty();)+
            }

            fn append_any(&mut self, value: &Value) -> Result<(), ChwireError> {
                let ty = self.ch_type();
                append_tuple_any(|| ty, &mut self.elements_mut(), value)
            }

            fn remove_last(&mut self) {
                $(self.columns.$idx.remove_last();)+
            }

            fn row_any(&self, row: usize) -> Value {
                Value::Tuple(vec![$(self.columns.$idx.row_any(row)),+])
            }

            fn read_prefix(&mut self, r: &mut Reader) -> Result<(), ChwireError> {
                $(self.columns.$idx.read_prefix(r)?;)+
                Ok(())
            }

            fn write_prefix(&self, w: &mut Writer) {
                $(self.columns.$idx.write_prefix(w);)+
            }

            fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError> {
                read_tuple(&mut self.elements_mut(), num, r)
            }

            fn write_to(&self, w: &mut Writer) {
                $(self.columns.$idx.write_to(w);)+
            }

            fn check_structure(&self) -> Result<(), ChwireError> {
                check_tuple(&self.elements())
            }

            fn reset(&mut self) {
                $(self.columns.$idx.reset();)+
            }

            fn to_json(
                &self,
                row: usize,
                ignore_double_quotes: bool,
                out: &mut Vec<u8>,
            ) -> Result<(), ChwireError> {
                json::append_elements(&self.elements(), row, ignore_double_quotes, out)
            }
        }

        impl<$($C: Column),+> Column for $name<$($C),+> {
            type Value = ($($C::Value,)+);

            fn append(&mut self, value: Self::Value) {
                $(self.columns.$idx.append(value.$idx);)+
            }

            fn row(&self, row: usize) -> Self::Value {
                ($(self.columns.$idx.row(row),)+)
            }
        }
    };
}

impl_tuple!(Tuple2; A a 0, B b 1);
impl_tuple!(Tuple3; A a 0, B b 1, C c 2);
impl_tuple!(Tuple4; A a 0, B b 1, C c 2, D d 3);
impl_tuple!(Tuple5; A a 0, B b 1, C c 2, D d 3, E e 4);

//==================================================================================
// 3. Dynamic Tuple
//==================================================================================

/// A tuple of any arity over boxed element columns.
pub struct Tuple {
    header: ColumnHeader,
    columns: Vec<Box<dyn ColumnBasic>>,
    names: Vec<Option<String>>,
}

impl Tuple {
    pub fn new(columns: Vec<Box<dyn ColumnBasic>>) -> Self {
        let names = vec![None; columns.len()];
        Self {
            header: ColumnHeader::default(),
            columns,
            names,
        }
    }

    /// A tuple whose elements carry names, as in `Tuple(a Int32, b String)`.
    pub fn with_names(columns: Vec<(Option<String>, Box<dyn ColumnBasic>)>) -> Self {
        let (names, columns) = columns.into_iter().unzip();
        Self {
            header: ColumnHeader::default(),
            columns,
            names,
        }
    }

    pub fn columns(&self) -> &[Box<dyn ColumnBasic>] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Box<dyn ColumnBasic>] {
        &mut self.columns
    }

    fn elements(&self) -> Vec<&dyn ColumnBasic> {
        let mut out: Vec<&dyn ColumnBasic> = Vec::with_capacity(self.columns.len());
        for c in &self.columns {
            out.push(c.as_ref());
        }
        out
    }

    fn elements_mut(&mut self) -> Vec<&mut dyn ColumnBasic> {
        let mut out: Vec<&mut dyn ColumnBasic> = Vec::with_capacity(self.columns.len());
        for c in self.columns.iter_mut() {
            out.push(c.as_mut());
        }
        out
    }
}

impl ColumnBasic for Tuple {
    fn header(&self) -> &ColumnHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ColumnHeader {
        &mut self.header
    }

    fn ch_type(&self) -> ChType {
        ChType::Tuple(
            self.names
                .iter()
                .cloned()
                .zip(self.columns.iter().map(|c| c.ch_type()))
                .collect(),
        )
    }

    fn num_row(&self) -> usize {
        self.columns.first().map_or(0, |c| c.num_row())
    }

    fn append_empty(&mut self) {
        for c in self.columns.iter_mut() {
            c.append_empty();
        }
    }

    fn append_any(&mut self, value: &Value) -> Result<(), ChwireError> {
        let ty = self.ch_type();
        append_tuple_any(|| ty, &mut self.elements_mut(), value)
    }

    fn remove_last(&mut self) {
        for c in self.columns.iter_mut() {
            c.remove_last();
        }
    }

    fn row_any(&self, row: usize) -> Value {
        Value::Tuple(self.columns.iter().map(|c| c.row_any(row)).collect())
    }

    fn read_prefix(&mut self, r: &mut Reader) -> Result<(), ChwireError> {
        for c in self.columns.iter_mut() {
            c.read_prefix(r)?;
        }
        Ok(())
    }

    fn write_prefix(&self, w: &mut Writer) {
        for c in &self.columns {
            c.write_prefix(w);
        }
    }

    fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError> {
        read_tuple(&mut self.elements_mut(), num, r)
    }

    fn write_to(&self, w: &mut Writer) {
        for c in &self.columns {
            c.write_to(w);
        }
    }

    fn check_structure(&self) -> Result<(), ChwireError> {
        check_tuple(&self.elements())
    }

    fn reset(&mut self) {
        for c in self.columns.iter_mut() {
            c.reset();
        }
    }

    fn to_json(
        &self,
        row: usize,
        ignore_double_quotes: bool,
        out: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        json::append_elements(&self.elements(), row, ignore_double_quotes, out)
    }
}

impl Column for Tuple {
    type Value = Vec<Value>;

    /// Elements that fail to convert are stored as their type's default.
    fn append(&mut self, value: Vec<Value>) {
        for (i, c) in self.columns.iter_mut().enumerate() {
            match value.get(i) {
                Some(v) => {
                    if let Err(e) = c.append_any(v) {
                        log::warn!("tuple element {}: {}; storing default", i, e);
                        c.append_empty();
                    }
                }
                None => c.append_empty(),
            }
        }
    }

    fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.row_any(row)).collect()
    }
}
