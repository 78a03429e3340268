//! `Map(K, V)`: encoded as `Array(Tuple(K, V))`. The layout is one cumulative
//! offset per row, then the flattened key column, then the flattened value
//! column.
//!
//! The typed row value is a hash map, so duplicate keys within one row collapse
//! (last wins). [`Map::row_pairs`] and [`Map::append_pairs`] keep wire order
//! and duplicates.

use std::hash::Hash;

use hashbrown::HashMap;

use crate::column::{
    append_all_or_none, invalid, json, value_mismatch, Column, ColumnBasic, ColumnHeader,
};
use crate::cursor::{Reader, Writer};
use crate::error::ChwireError;
use crate::types::{ChType, Value};
use crate::utils::{check_offsets, extend_le_u64, last_offset, offset_range, read_offsets};

#[derive(Debug)]
pub struct Map<K: ColumnBasic, V: ColumnBasic> {
    header: ColumnHeader,
    offsets: Vec<u64>,
    keys: K,
    values: V,
    raw: Vec<u8>,
}

impl<K: ColumnBasic, V: ColumnBasic> Map<K, V> {
    pub fn new(keys: K, values: V) -> Self {
        Self {
            header: ColumnHeader::default(),
            offsets: Vec::new(),
            keys,
            values,
            raw: Vec::new(),
        }
    }

    /// Starts a row of `len` entries; the caller appends to both child columns.
    pub fn append_len(&mut self, len: usize) {
        let last = last_offset(&self.offsets);
        self.offsets.push(last + len as u64);
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn key_column(&self) -> &K {
        &self.keys
    }

    pub fn value_column(&self) -> &V {
        &self.values
    }

    pub fn key_column_mut(&mut self) -> &mut K {
        &mut self.keys
    }

    pub fn value_column_mut(&mut self) -> &mut V {
        &mut self.values
    }
}

impl<K: Column, V: Column> Map<K, V> {
    /// Appends one row from key/value pairs, preserving their order.
    pub fn append_pairs<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K::Value, V::Value)>,
    {
        let mut len = 0;
        for (k, v) in pairs {
            self.keys.append(k);
            self.values.append(v);
            len += 1;
        }
        self.append_len(len);
    }

    /// Row `row` as key/value pairs in wire order.
    pub fn row_pairs(&self, row: usize) -> Vec<(K::Value, V::Value)> {
        offset_range(&self.offsets, row)
            .map(|i| (self.keys.row(i), self.values.row(i)))
            .collect()
    }
}

impl<K: ColumnBasic, V: ColumnBasic> ColumnBasic for Map<K, V> {
    fn header(&self) -> &ColumnHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ColumnHeader {
        &mut self.header
    }

    fn ch_type(&self) -> ChType {
        ChType::Map(
            Box::new(self.keys.ch_type()),
            Box::new(self.values.ch_type()),
        )
    }

    fn num_row(&self) -> usize {
        self.offsets.len()
    }

    fn append_empty(&mut self) {
        self.append_len(0);
    }

    fn append_any(&mut self, value: &Value) -> Result<(), ChwireError> {
        let Value::Map(pairs) = value else {
            return Err(value_mismatch(&self.ch_type(), value));
        };
        for (i, (k, v)) in pairs.iter().enumerate() {
            let mut children: [&mut dyn ColumnBasic; 2] = [&mut self.keys, &mut self.values];
            if let Err(e) = append_all_or_none(&mut children, &[k.clone(), v.clone()]) {
                for _ in 0..i {
                    self.keys.remove_last();
                    self.values.remove_last();
                }
                return Err(e);
            }
        }
        self.append_len(pairs.len());
        Ok(())
    }

    fn remove_last(&mut self) {
        let Some(end) = self.offsets.pop() else {
            return;
        };
        for _ in last_offset(&self.offsets)..end {
            self.keys.remove_last();
            self.values.remove_last();
        }
    }

    /// Duplicate keys collapse onto the first occurrence with the last value.
    fn row_any(&self, row: usize) -> Value {
        let mut pairs: Vec<(Value, Value)> = Vec::new();
        for i in offset_range(&self.offsets, row) {
            let (k, v) = (self.keys.row_any(i), self.values.row_any(i));
            match pairs.iter_mut().find(|(existing, _)| *existing == k) {
                Some(slot) => slot.1 = v,
                None => pairs.push((k, v)),
            }
        }
        Value::Map(pairs)
    }

    fn read_prefix(&mut self, r: &mut Reader) -> Result<(), ChwireError> {
        self.keys.read_prefix(r)?;
        self.values.read_prefix(r)
    }

    fn write_prefix(&self, w: &mut Writer) {
        self.keys.write_prefix(w);
        self.values.write_prefix(w);
    }

    fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError> {
        read_offsets(r, num, &mut self.raw, &mut self.offsets)?;
        let total = usize::try_from(last_offset(&self.offsets))
            .map_err(|_| invalid("map entry count overflows usize"))?;
        self.keys.read_raw(total, r)?;
        self.values.read_raw(total, r)
    }

    fn write_to(&self, w: &mut Writer) {
        extend_le_u64(&self.offsets, &mut w.output);
        self.keys.write_to(w);
        self.values.write_to(w);
    }

    fn check_structure(&self) -> Result<(), ChwireError> {
        check_offsets(&self.offsets, self.keys.num_row()).map_err(invalid)?;
        if self.values.num_row() != self.keys.num_row() {
            return Err(invalid(format!(
                "map has {} keys but {} values",
                self.keys.num_row(),
                self.values.num_row()
            )));
        }
        self.keys.check_structure()?;
        self.values.check_structure()
    }

    fn reset(&mut self) {
        self.offsets.clear();
        self.keys.reset();
        self.values.reset();
    }

    /// Pairs are rendered in wire order; keys are always quoted.
    fn to_json(
        &self,
        row: usize,
        ignore_double_quotes: bool,
        out: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        out.push(b'{');
        for (n, i) in offset_range(&self.offsets, row).enumerate() {
            if n > 0 {
                out.push(b',');
            }
            json::append_key(out, |out| self.keys.to_json(i, true, out))?;
            self.values.to_json(i, ignore_double_quotes, out)?;
        }
        out.push(b'}');
        Ok(())
    }
}

impl<K, V> Column for Map<K, V>
where
    K: Column,
    V: Column,
    K::Value: Eq + Hash,
{
    type Value = HashMap<K::Value, V::Value>;

    fn append(&mut self, value: HashMap<K::Value, V::Value>) {
        self.append_pairs(value);
    }

    fn row(&self, row: usize) -> HashMap<K::Value, V::Value> {
        self.row_pairs(row).into_iter().collect()
    }
}
