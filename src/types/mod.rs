//! This module defines the strongly-typed representations shared by the
//! column family: the parsed wire type grammar and the dynamic row value used
//! by the "any"-typed accessors.

pub mod ch_type;
pub mod value;

// Re-export the main type(s) for easier access.
pub use ch_type::ChType;
pub use value::Value;
