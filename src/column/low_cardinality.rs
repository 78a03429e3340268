//! `LowCardinality(T)`: dictionary encoding. Each block carries its own
//! dictionary of distinct values followed by one index per row.
//!
//! Wire layout:
//! - prefix: `u64` keys serialization version (always 1)
//! - body: `u64` serialization type (index width in the low byte plus flag
//!   bits), `u64` dictionary size, the dictionary column, `u64` key count, and
//!   the keys at the chosen width.
//!
//! In a nullable column dictionary slot 0 is a placeholder that stands for
//! NULL, and real values start at key 1. A column without rows writes no body
//! and reads none.

use std::hash::Hash;

use hashbrown::HashMap;

use crate::column::{invalid, Column, ColumnBasic, ColumnHeader};
use crate::cursor::{Reader, Writer};
use crate::error::ChwireError;
use crate::types::{ChType, Value};

const KEYS_SERIALIZATION_VERSION: u64 = 1;

const INDEX_TYPE_MASK: u64 = 0xFF;
const NEED_GLOBAL_DICTIONARY_BIT: u64 = 1 << 8;
const HAS_ADDITIONAL_KEYS_BIT: u64 = 1 << 9;
const NEED_UPDATE_DICTIONARY_BIT: u64 = 1 << 10;

/// Index type code for the smallest width that can address `dict_size` slots.
fn index_type_for(dict_size: usize) -> u64 {
    match dict_size as u64 {
        0..=0x100 => 0,
        0x101..=0x1_0000 => 1,
        0x1_0001..=0x1_0000_0000 => 2,
        _ => 3,
    }
}

fn index_width(index_type: u64) -> Result<usize, ChwireError> {
    match index_type {
        0 => Ok(1),
        1 => Ok(2),
        2 => Ok(4),
        3 => Ok(8),
        other => Err(invalid(format!("unknown index type {}", other))),
    }
}

pub struct LowCardinality<C>
where
    C: Column,
    C::Value: Eq + Hash + Clone + Send,
{
    header: ColumnHeader,
    /// Reverse lookup from value to its dictionary slot.
    dict: HashMap<C::Value, u64>,
    dict_column: C,
    keys: Vec<u64>,
    nullable: bool,
    raw: Vec<u8>,
}

impl<C> LowCardinality<C>
where
    C: Column,
    C::Value: Eq + Hash + Clone + Send,
{
    /// A `LowCardinality(T)` column over an empty dictionary column of type `T`.
    pub fn new(dict_column: C) -> Self {
        Self::build(dict_column, false)
    }

    /// A `LowCardinality(Nullable(T))` column.
    pub fn new_nullable(dict_column: C) -> Self {
        Self::build(dict_column, true)
    }

    fn build(dict_column: C, nullable: bool) -> Self {
        let mut col = Self {
            header: ColumnHeader::default(),
            dict: HashMap::new(),
            dict_column,
            keys: Vec::new(),
            nullable,
            raw: Vec::new(),
        };
        col.reset();
        col
    }

    /// Appends `value`, adding it to the dictionary on first sight.
    pub fn append_dict(&mut self, value: C::Value) {
        let dict_column = &mut self.dict_column;
        let key = *self.dict.entry(value).or_insert_with_key(|v| {
            let slot = dict_column.num_row() as u64;
            dict_column.append(v.clone());
            slot
        });
        self.keys.push(key);
    }

    /// Appends key 0. On a nullable column that is NULL; on a non-nullable one
    /// it repeats dictionary slot 0, which is filled with the default value
    /// if the dictionary is still empty.
    pub fn append_dict_nil(&mut self) {
        if !self.nullable && self.dict_column.num_row() == 0 {
            self.append_empty();
            return;
        }
        self.keys.push(0);
    }

    pub fn append_dict_p(&mut self, value: Option<C::Value>) {
        match value {
            Some(v) => self.append_dict(v),
            None => self.append_dict_nil(),
        }
    }

    /// Row `row`, or `None` when it is NULL in a nullable column.
    pub fn row_p(&self, row: usize) -> Option<C::Value> {
        let key = self.keys[row];
        if self.nullable && key == 0 {
            None
        } else {
            Some(self.dict_column.row(key as usize))
        }
    }

    pub fn value_is_nil(&self, row: usize) -> bool {
        self.nullable && self.keys[row] == 0
    }

    /// One dictionary index per row.
    pub fn keys(&self) -> &[u64] {
        &self.keys
    }

    /// The dictionary column, including the NULL placeholder slot if nullable.
    pub fn dictionary(&self) -> &C {
        &self.dict_column
    }

    /// Number of distinct non-NULL values in the dictionary.
    pub fn dict_len(&self) -> usize {
        self.dict.len()
    }

    fn first_value_slot(&self) -> usize {
        usize::from(self.nullable)
    }

    fn rebuild_lookup(&mut self) {
        self.dict.clear();
        for slot in self.first_value_slot()..self.dict_column.num_row() {
            self.dict
                .entry(self.dict_column.row(slot))
                .or_insert(slot as u64);
        }
    }
}

impl<C> ColumnBasic for LowCardinality<C>
where
    C: Column,
    C::Value: Eq + Hash + Clone + Send,
{
    fn header(&self) -> &ColumnHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ColumnHeader {
        &mut self.header
    }

    fn ch_type(&self) -> ChType {
        let inner = self.dict_column.ch_type();
        if self.nullable {
            ChType::LowCardinality(Box::new(ChType::Nullable(Box::new(inner))))
        } else {
            ChType::LowCardinality(Box::new(inner))
        }
    }

    fn num_row(&self) -> usize {
        self.keys.len()
    }

    fn append_empty(&mut self) {
        if self.nullable {
            self.append_dict_nil();
            return;
        }
        self.dict_column.append_empty();
        let last = self.dict_column.num_row() - 1;
        let value = self.dict_column.row(last);
        self.dict_column.remove_last();
        self.append_dict(value);
    }

    fn append_any(&mut self, value: &Value) -> Result<(), ChwireError> {
        if self.nullable && value.is_null() {
            self.append_dict_nil();
            return Ok(());
        }
        // Convert through the dictionary column, then intern the typed value.
        self.dict_column.append_any(value)?;
        let last = self.dict_column.num_row() - 1;
        let typed = self.dict_column.row(last);
        self.dict_column.remove_last();
        self.append_dict(typed);
        Ok(())
    }

    /// Dictionary entries are kept.
    fn remove_last(&mut self) {
        self.keys.pop();
    }

    fn row_any(&self, row: usize) -> Value {
        let key = self.keys[row];
        if self.nullable && key == 0 {
            Value::Null
        } else {
            self.dict_column.row_any(key as usize)
        }
    }

    fn read_prefix(&mut self, r: &mut Reader) -> Result<(), ChwireError> {
        let version = r.uint64()?;
        if version != KEYS_SERIALIZATION_VERSION {
            return Err(ChwireError::UnsupportedFeature(format!(
                "low cardinality keys serialization version {}",
                version
            )));
        }
        Ok(())
    }

    fn write_prefix(&self, w: &mut Writer) {
        w.uint64(KEYS_SERIALIZATION_VERSION);
    }

    fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError> {
        self.reset();
        if num == 0 {
            return Ok(());
        }

        let serialization_type = r.uint64()?;
        if serialization_type & NEED_GLOBAL_DICTIONARY_BIT != 0 {
            return Err(ChwireError::UnsupportedFeature(
                "low cardinality global dictionary".to_string(),
            ));
        }
        if serialization_type & HAS_ADDITIONAL_KEYS_BIT == 0 {
            return Err(ChwireError::UnsupportedFeature(
                "low cardinality without additional keys".to_string(),
            ));
        }
        let width = index_width(serialization_type & INDEX_TYPE_MASK)?;

        let dict_size = usize::try_from(r.uint64()?)
            .map_err(|_| invalid("dictionary size overflows usize"))?;
        self.dict_column.read_raw(dict_size, r)?;

        let key_count = r.uint64()?;
        if key_count != num as u64 {
            return Err(invalid(format!(
                "{} keys for a block of {} rows",
                key_count, num
            )));
        }

        let len = num
            .checked_mul(width)
            .ok_or_else(|| invalid(format!("{} keys of {} bytes overflow usize", num, width)))?;
        self.raw.clear();
        r.read_into(&mut self.raw, len)?;
        self.keys.extend(self.raw.chunks_exact(width).map(|chunk| {
            let mut word = [0u8; 8];
            word[..width].copy_from_slice(chunk);
            u64::from_le_bytes(word)
        }));
        if let Some(pos) = self.keys.iter().position(|&k| k >= dict_size as u64) {
            return Err(invalid(format!(
                "key {} at row {} is outside a dictionary of {}",
                self.keys[pos], pos, dict_size
            )));
        }

        self.rebuild_lookup();
        Ok(())
    }

    fn write_to(&self, w: &mut Writer) {
        if self.keys.is_empty() {
            return;
        }
        let dict_size = self.dict_column.num_row();
        let index_type = index_type_for(dict_size);
        w.uint64(index_type | HAS_ADDITIONAL_KEYS_BIT | NEED_UPDATE_DICTIONARY_BIT);
        w.uint64(dict_size as u64);
        self.dict_column.write_to(w);
        w.uint64(self.keys.len() as u64);
        let width = 1usize << index_type;
        for &k in &self.keys {
            w.raw(&k.to_le_bytes()[..width]);
        }
    }

    fn check_structure(&self) -> Result<(), ChwireError> {
        let dict_size = self.dict_column.num_row() as u64;
        if self.nullable && dict_size == 0 {
            return Err(invalid("nullable dictionary lacks its NULL slot"));
        }
        if let Some(pos) = self.keys.iter().position(|&k| k >= dict_size) {
            return Err(invalid(format!(
                "key {} at row {} is outside a dictionary of {}",
                self.keys[pos], pos, dict_size
            )));
        }
        self.dict_column.check_structure()
    }

    fn reset(&mut self) {
        self.dict.clear();
        self.dict_column.reset();
        self.keys.clear();
        if self.nullable {
            self.dict_column.append_empty();
        }
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }

    fn is_low_cardinality(&self) -> bool {
        true
    }

    fn to_json(
        &self,
        row: usize,
        ignore_double_quotes: bool,
        out: &mut Vec<u8>,
    ) -> Result<(), ChwireError> {
        let key = self.keys[row];
        if self.nullable && key == 0 {
            out.extend_from_slice(b"null");
            return Ok(());
        }
        self.dict_column.to_json(key as usize, ignore_double_quotes, out)
    }
}

impl<C> Column for LowCardinality<C>
where
    C: Column,
    C::Value: Eq + Hash + Clone + Send,
{
    type Value = C::Value;

    fn append(&mut self, value: C::Value) {
        self.append_dict(value);
    }

    /// NULL rows of a nullable column return the placeholder value.
    fn row(&self, row: usize) -> C::Value {
        self.dict_column.row(self.keys[row] as usize)
    }
}
