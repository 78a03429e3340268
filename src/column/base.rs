//! Fixed-width scalar columns: every signed and unsigned integer width from 8
//! to 128 bits, `Float32`/`Float64` and `Bool`. Values are stored contiguously
//! and travel as little-endian bytes with no per-row framing.

use crate::column::{value_mismatch, Column, ColumnBasic, ColumnHeader};
use crate::cursor::{Reader, Writer};
use crate::error::ChwireError;
use crate::types::{ChType, Value};

/// A scalar that a [`Base`] column can hold.
pub trait Primitive: Copy + Default + PartialEq + std::fmt::Debug + Send + 'static {
    /// Encoded width in bytes.
    const SIZE: usize;

    fn ch_type() -> ChType;

    /// Appends the little-endian encoding of every value.
    fn encode_all(values: &[Self], out: &mut Vec<u8>);

    /// Decodes one value from exactly `SIZE` bytes.
    fn decode(bytes: &[u8]) -> Self;

    fn to_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

/// Implements `Primitive` for the numeric types. On little-endian targets the
/// in-memory slice already is the wire encoding.
macro_rules! impl_primitive {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl Primitive for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn ch_type() -> ChType {
                    ChType::$variant
                }

                fn encode_all(values: &[Self], out: &mut Vec<u8>) {
                    #[cfg(target_endian = "little")]
                    out.extend_from_slice(bytemuck::cast_slice(values));
                    #[cfg(not(target_endian = "little"))]
                    for v in values {
                        out.extend_from_slice(&v.to_le_bytes());
                    }
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }

                fn to_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_primitive!(
    i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64, i128 => Int128,
    u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64, u128 => UInt128,
    f32 => Float32, f64 => Float64,
);

impl Primitive for bool {
    const SIZE: usize = 1;

    fn ch_type() -> ChType {
        ChType::Bool
    }

    fn encode_all(values: &[Self], out: &mut Vec<u8>) {
        out.extend(values.iter().map(|&v| v as u8));
    }

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn to_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            Value::UInt8(v) => Some(*v != 0),
            _ => None,
        }
    }
}

/// A column of fixed-width scalars.
#[derive(Debug, Default)]
pub struct Base<T: Primitive> {
    header: ColumnHeader,
    values: Vec<T>,
    raw: Vec<u8>,
}

impl<T: Primitive> Base<T> {
    pub fn new() -> Self {
        Self {
            header: ColumnHeader::default(),
            values: Vec::new(),
            raw: Vec::new(),
        }
    }

    pub fn from_values(values: Vec<T>) -> Self {
        Self {
            values,
            ..Self::new()
        }
    }

    /// Borrows the buffered rows without copying.
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T: Primitive> ColumnBasic for Base<T> {
    fn header(&self) -> &ColumnHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ColumnHeader {
        &mut self.header
    }

    fn ch_type(&self) -> ChType {
        T::ch_type()
    }

    fn num_row(&self) -> usize {
        self.values.len()
    }

    fn append_empty(&mut self) {
        self.values.push(T::default());
    }

    fn append_any(&mut self, value: &Value) -> Result<(), ChwireError> {
        let v = T::from_value(value).ok_or_else(|| value_mismatch(&T::ch_type(), value))?;
        self.values.push(v);
        Ok(())
    }

    fn remove_last(&mut self) {
        self.values.pop();
    }

    fn row_any(&self, row: usize) -> Value {
        self.values[row].to_value()
    }

    fn read_raw(&mut self, num: usize, r: &mut Reader) -> Result<(), ChwireError> {
        self.values.clear();
        self.raw.clear();
        let len = num.checked_mul(T::SIZE).ok_or_else(|| {
            ChwireError::UnsupportedFeature(format!("{} rows of {} bytes", num, T::SIZE))
        })?;
        r.read_into(&mut self.raw, len)?;
        self.values
            .extend(self.raw.chunks_exact(T::SIZE).map(T::decode));
        Ok(())
    }

    fn write_to(&self, w: &mut Writer) {
        T::encode_all(&self.values, &mut w.output);
    }

    fn reset(&mut self) {
        self.values.clear();
    }
}

impl<T: Primitive> Column for Base<T> {
    type Value = T;

    fn append(&mut self, value: T) {
        self.values.push(value);
    }

    fn row(&self, row: usize) -> T {
        self.values[row]
    }

    fn data(&self) -> Vec<T> {
        self.values.clone()
    }

    fn read_all(&self, out: &mut Vec<T>) {
        out.extend_from_slice(&self.values);
    }
}
