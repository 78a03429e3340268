//! Row rendering as JSON text, the building blocks behind
//! [`ColumnBasic::to_json`](crate::column::ColumnBasic::to_json).
//!
//! Scalars and strings go through `serde_json`, so escaping and number
//! formatting follow it; non-finite floats render as `null`. With
//! `ignore_double_quotes` a string is escaped but not quoted, which is how map
//! keys are rendered before being wrapped in quotes of their own.

use crate::column::ColumnBasic;
use crate::error::ChwireError;
use crate::types::Value;

/// Appends `bytes` as a JSON string. Invalid UTF-8 is replaced.
pub(crate) fn append_string(
    bytes: &[u8],
    ignore_double_quotes: bool,
    out: &mut Vec<u8>,
) -> Result<(), ChwireError> {
    let text = String::from_utf8_lossy(bytes);
    if ignore_double_quotes {
        let quoted = serde_json::to_vec(&*text)?;
        out.extend_from_slice(&quoted[1..quoted.len() - 1]);
    } else {
        serde_json::to_writer(&mut *out, &*text)?;
    }
    Ok(())
}

/// Appends a dynamic value. Arrays and tuples render as JSON arrays, maps as
/// objects with their pairs in wire order.
pub(crate) fn append_value(
    value: &Value,
    ignore_double_quotes: bool,
    out: &mut Vec<u8>,
) -> Result<(), ChwireError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(v) => serde_json::to_writer(&mut *out, v)?,
        Value::Int8(v) => serde_json::to_writer(&mut *out, v)?,
        Value::Int16(v) => serde_json::to_writer(&mut *out, v)?,
        Value::Int32(v) => serde_json::to_writer(&mut *out, v)?,
        Value::Int64(v) => serde_json::to_writer(&mut *out, v)?,
        Value::Int128(v) => serde_json::to_writer(&mut *out, v)?,
        Value::UInt8(v) => serde_json::to_writer(&mut *out, v)?,
        Value::UInt16(v) => serde_json::to_writer(&mut *out, v)?,
        Value::UInt32(v) => serde_json::to_writer(&mut *out, v)?,
        Value::UInt64(v) => serde_json::to_writer(&mut *out, v)?,
        Value::UInt128(v) => serde_json::to_writer(&mut *out, v)?,
        Value::Float32(v) => serde_json::to_writer(&mut *out, v)?,
        Value::Float64(v) => serde_json::to_writer(&mut *out, v)?,
        Value::String(bytes) => append_string(bytes, ignore_double_quotes, out)?,
        Value::Array(items) | Value::Tuple(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                append_value(item, ignore_double_quotes, out)?;
            }
            out.push(b']');
        }
        Value::Map(pairs) => {
            out.push(b'{');
            for (i, (k, v)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                append_key(out, |out| append_value(k, true, out))?;
                append_value(v, ignore_double_quotes, out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// Appends an object key followed by `:`. `render` writes the key unquoted;
/// the quotes are added here so numeric keys become JSON strings.
pub(crate) fn append_key<F>(out: &mut Vec<u8>, render: F) -> Result<(), ChwireError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), ChwireError>,
{
    out.push(b'"');
    render(out)?;
    out.extend_from_slice(b"\":");
    Ok(())
}

/// Appends row `row` of each column as one JSON array.
pub(crate) fn append_elements(
    columns: &[&dyn ColumnBasic],
    row: usize,
    ignore_double_quotes: bool,
    out: &mut Vec<u8>,
) -> Result<(), ChwireError> {
    out.push(b'[');
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        column.to_json(row, ignore_double_quotes, out)?;
    }
    out.push(b']');
    Ok(())
}
