//! This module defines the canonical, type-safe representation of the column
//! type strings carried in block headers (`"Array(Nullable(String))"` and so on).

use crate::error::ChwireError;
use std::fmt;

/// Deepest nesting of type constructors accepted from the wire.
pub const MAX_TYPE_DEPTH: usize = 64;

/// A parsed column type.
///
/// Alias types (dates, enums) keep their textual arguments so that they print
/// back exactly; `physical()` reduces them to the representation on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChType {
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    Float32,
    Float64,
    Bool,
    String,
    FixedString(usize),
    Date,
    Date32,
    /// Optional timezone argument, verbatim.
    DateTime(Option<String>),
    /// Precision and optional timezone, verbatim.
    DateTime64(String),
    /// Enum body, verbatim.
    Enum8(String),
    Enum16(String),
    Nullable(Box<ChType>),
    Array(Box<ChType>),
    Map(Box<ChType>, Box<ChType>),
    /// Elements with their optional names.
    Tuple(Vec<(Option<String>, ChType)>),
    LowCardinality(Box<ChType>),
}

impl ChType {
    /// Parses a wire type string. Nesting deeper than [`MAX_TYPE_DEPTH`] is
    /// rejected.
    pub fn parse(input: &str) -> Result<Self, ChwireError> {
        Self::parse_at(input, 0)
    }

    fn parse_at(input: &str, depth: usize) -> Result<Self, ChwireError> {
        if depth > MAX_TYPE_DEPTH {
            return Err(ChwireError::InvalidType(format!(
                "type nested deeper than {} levels",
                MAX_TYPE_DEPTH
            )));
        }
        let s = input.trim();
        let invalid = || ChwireError::InvalidType(input.to_string());
        let nested = |a: &str| Self::parse_at(a, depth + 1);

        let (name, args) = match s.find('(') {
            Some(open) => {
                if !s.ends_with(')') {
                    return Err(invalid());
                }
                (s[..open].trim(), Some(&s[open + 1..s.len() - 1]))
            }
            None => (s, None),
        };

        let ty = match (name, args) {
            ("Int8", None) => Self::Int8,
            ("Int16", None) => Self::Int16,
            ("Int32", None) => Self::Int32,
            ("Int64", None) => Self::Int64,
            ("Int128", None) => Self::Int128,
            ("UInt8", None) => Self::UInt8,
            ("UInt16", None) => Self::UInt16,
            ("UInt32", None) => Self::UInt32,
            ("UInt64", None) => Self::UInt64,
            ("UInt128", None) => Self::UInt128,
            ("Float32", None) => Self::Float32,
            ("Float64", None) => Self::Float64,
            ("Bool", None) => Self::Bool,
            ("String", None) => Self::String,
            ("Date", None) => Self::Date,
            ("Date32", None) => Self::Date32,
            ("DateTime", None) => Self::DateTime(None),
            ("DateTime", Some(tz)) => Self::DateTime(Some(tz.trim().to_string())),
            ("DateTime64", Some(a)) => Self::DateTime64(a.trim().to_string()),
            ("Enum8", Some(a)) => Self::Enum8(a.trim().to_string()),
            ("Enum16", Some(a)) => Self::Enum16(a.trim().to_string()),
            ("FixedString", Some(n)) => {
                let n: usize = n.trim().parse().map_err(|_| invalid())?;
                if n == 0 {
                    return Err(invalid());
                }
                Self::FixedString(n)
            }
            ("Nullable", Some(a)) => Self::Nullable(Box::new(nested(a)?)),
            ("Array", Some(a)) => Self::Array(Box::new(nested(a)?)),
            ("LowCardinality", Some(a)) => Self::LowCardinality(Box::new(nested(a)?)),
            ("Map", Some(a)) => {
                let parts = split_top_level(a);
                if parts.len() != 2 {
                    return Err(invalid());
                }
                Self::Map(Box::new(nested(parts[0])?), Box::new(nested(parts[1])?))
            }
            ("Tuple", Some(a)) => {
                let mut elements = Vec::new();
                for part in split_top_level(a) {
                    elements.push(parse_tuple_element(part, depth + 1)?);
                }
                if elements.is_empty() {
                    return Err(invalid());
                }
                Self::Tuple(elements)
            }
            _ => return Err(invalid()),
        };
        Ok(ty)
    }

    /// Reduces alias types to the physical type their values are encoded as.
    /// Tuple element names are dropped.
    pub fn physical(&self) -> ChType {
        match self {
            Self::Bool => Self::UInt8,
            Self::Date => Self::UInt16,
            Self::Date32 => Self::Int32,
            Self::DateTime(_) => Self::UInt32,
            Self::DateTime64(_) => Self::Int64,
            Self::Enum8(_) => Self::Int8,
            Self::Enum16(_) => Self::Int16,
            Self::Nullable(t) => Self::Nullable(Box::new(t.physical())),
            Self::Array(t) => Self::Array(Box::new(t.physical())),
            Self::LowCardinality(t) => Self::LowCardinality(Box::new(t.physical())),
            Self::Map(k, v) => Self::Map(Box::new(k.physical()), Box::new(v.physical())),
            Self::Tuple(elems) => {
                Self::Tuple(elems.iter().map(|(_, t)| (None, t.physical())).collect())
            }
            other => other.clone(),
        }
    }

    /// True when a column decoding `self` can decode data declared as `other`.
    pub fn is_compatible(&self, other: &ChType) -> bool {
        self.physical() == other.physical()
    }
}

/// Splits on commas that are not nested inside parentheses or quotes.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0;
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' if i == 0 || bytes[i - 1] != b'\\' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth -= 1,
            b',' if !in_quote && depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// A tuple element is either `Type` or `name Type`.
fn parse_tuple_element(
    part: &str,
    depth: usize,
) -> Result<(Option<String>, ChType), ChwireError> {
    if let Ok(ty) = ChType::parse_at(part, depth) {
        return Ok((None, ty));
    }
    match part.trim().split_once(' ') {
        Some((name, ty)) if !name.contains('(') => {
            Ok((Some(name.to_string()), ChType::parse_at(ty, depth)?))
        }
        _ => Err(ChwireError::InvalidType(part.to_string())),
    }
}

/// Provides the canonical string representation, as sent in block headers.
impl fmt::Display for ChType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedString(n) => write!(f, "FixedString({})", n),
            Self::DateTime(None) => write!(f, "DateTime"),
            Self::DateTime(Some(tz)) => write!(f, "DateTime({})", tz),
            Self::DateTime64(a) => write!(f, "DateTime64({})", a),
            Self::Enum8(a) => write!(f, "Enum8({})", a),
            Self::Enum16(a) => write!(f, "Enum16({})", a),
            Self::Nullable(t) => write!(f, "Nullable({})", t),
            Self::Array(t) => write!(f, "Array({})", t),
            Self::LowCardinality(t) => write!(f, "LowCardinality({})", t),
            Self::Map(k, v) => write!(f, "Map({}, {})", k, v),
            Self::Tuple(elems) => {
                write!(f, "Tuple(")?;
                for (i, (name, t)) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match name {
                        Some(n) => write!(f, "{} {}", n, t)?,
                        None => write!(f, "{}", t)?,
                    }
                }
                write!(f, ")")
            }
            // Simple types print as their variant name.
            other => write!(f, "{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_print_roundtrip() {
        for s in [
            "Int8",
            "UInt128",
            "Array(Array(Array(Int32)))",
            "Map(String, Array(Nullable(UInt64)))",
            "Tuple(Int32, String)",
            "Tuple(a Int32, b Array(String))",
            "LowCardinality(Nullable(String))",
            "DateTime('Europe/Berlin')",
            "DateTime64(3, 'UTC')",
            "Enum8('a' = 1, 'b,c' = 2)",
            "FixedString(16)",
        ] {
            let ty = ChType::parse(s).unwrap();
            assert_eq!(ty.to_string(), s);
        }
    }

    #[test]
    fn test_physical_aliases() {
        let date = ChType::parse("Array(Date)").unwrap();
        assert!(date.is_compatible(&ChType::Array(Box::new(ChType::UInt16))));
        let named = ChType::parse("Tuple(x Enum8('a' = 1), y DateTime)").unwrap();
        assert_eq!(named.physical().to_string(), "Tuple(Int8, UInt32)");
        assert!(!ChType::Int32.is_compatible(&ChType::UInt32));
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        let nest = |n: usize| format!("{}UInt8{}", "Array(".repeat(n), ")".repeat(n));
        assert!(ChType::parse(&nest(MAX_TYPE_DEPTH)).is_ok());

        let err = ChType::parse(&nest(MAX_TYPE_DEPTH + 1)).unwrap_err();
        assert!(matches!(err, ChwireError::InvalidType(ref m) if m.contains("nested deeper")));

        // A hostile header must fail cleanly instead of exhausting the stack.
        let hostile = "Array(".repeat(100_000);
        assert!(ChType::parse(&hostile).is_err());
        let tuples = format!("{}Int8{}", "Tuple(a ".repeat(200), ")".repeat(200));
        assert!(ChType::parse(&tuples).is_err());
    }

    #[test]
    fn test_invalid_types() {
        for s in ["", "Int", "Array(", "Map(String)", "FixedString(x)", "Nullable"] {
            assert!(ChType::parse(s).is_err(), "{s} should not parse");
        }
    }
}
