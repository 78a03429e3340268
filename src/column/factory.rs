//! Builds a column from a wire type string, for callers that only learn the
//! schema at runtime (for example from an insert header block).

use crate::column::{
    Array, Base, ColumnBasic, FixedString, LowCardinality, Map, Nullable, StringColumn, Tuple,
};
use crate::error::ChwireError;
use crate::types::ChType;

/// Parses `ch_type` and returns an empty column that decodes it. The column's
/// declared type is set to `ch_type` verbatim.
pub fn new_column(ch_type: &str) -> Result<Box<dyn ColumnBasic>, ChwireError> {
    let parsed = ChType::parse(ch_type)?;
    let mut column = column_for_type(&parsed)?;
    column.set_type(ch_type.trim().as_bytes());
    Ok(column)
}

/// Returns an empty column for an already parsed type.
pub fn column_for_type(ch_type: &ChType) -> Result<Box<dyn ColumnBasic>, ChwireError> {
    let column: Box<dyn ColumnBasic> = match ch_type {
        ChType::Int8 | ChType::Enum8(_) => Box::new(Base::<i8>::new()),
        ChType::Int16 | ChType::Enum16(_) => Box::new(Base::<i16>::new()),
        ChType::Int32 | ChType::Date32 => Box::new(Base::<i32>::new()),
        ChType::Int64 | ChType::DateTime64(_) => Box::new(Base::<i64>::new()),
        ChType::Int128 => Box::new(Base::<i128>::new()),
        ChType::UInt8 => Box::new(Base::<u8>::new()),
        ChType::UInt16 | ChType::Date => Box::new(Base::<u16>::new()),
        ChType::UInt32 | ChType::DateTime(_) => Box::new(Base::<u32>::new()),
        ChType::UInt64 => Box::new(Base::<u64>::new()),
        ChType::UInt128 => Box::new(Base::<u128>::new()),
        ChType::Float32 => Box::new(Base::<f32>::new()),
        ChType::Float64 => Box::new(Base::<f64>::new()),
        ChType::Bool => Box::new(Base::<bool>::new()),
        ChType::String => Box::new(StringColumn::new()),
        ChType::FixedString(n) => Box::new(FixedString::new(*n)),
        ChType::Nullable(inner) => Box::new(Nullable::new(column_for_type(inner)?)),
        ChType::Array(inner) => Box::new(Array::new(column_for_type(inner)?)),
        ChType::Map(k, v) => Box::new(Map::new(column_for_type(k)?, column_for_type(v)?)),
        ChType::Tuple(elements) => {
            let mut columns = Vec::with_capacity(elements.len());
            for (name, ty) in elements {
                columns.push((name.clone(), column_for_type(ty)?));
            }
            Box::new(Tuple::with_names(columns))
        }
        ChType::LowCardinality(inner) => match inner.as_ref() {
            ChType::Nullable(value) => {
                Box::new(LowCardinality::new_nullable(column_for_type(value)?))
            }
            value => Box::new(LowCardinality::new(column_for_type(value)?)),
        },
    };
    Ok(column)
}
