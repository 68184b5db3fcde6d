//! Attribute types, runtime values, and record identifiers.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Declared type of a schema attribute.
///
/// Every type has a fixed on-disk width; `Text` carries its declared
/// length and always occupies exactly that many bytes, zero-padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// 32-bit signed integer (4 bytes)
    Int,
    /// 32-bit float (4 bytes)
    Float,
    /// Boolean (1 byte)
    Bool,
    /// Fixed-width string of `len` bytes
    Text { len: usize },
}

impl DataType {
    /// On-disk width of a value of this type
    pub const fn byte_len(self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Float => 4,
            DataType::Bool => 1,
            DataType::Text { len } => len,
        }
    }

    /// Wire code used in index metadata pages
    pub const fn code(self) -> u32 {
        match self {
            DataType::Int => 0,
            DataType::Text { .. } => 1,
            DataType::Float => 2,
            DataType::Bool => 3,
        }
    }
}

/// A runtime value of one of the supported attribute types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
    Text(String),
}

impl Value {
    /// Compare two values of the same type.
    ///
    /// Returns `None` for mixed types, and for float comparisons
    /// involving NaN.
    pub fn cmp_same_type(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Record identifier: a (page, slot) pair addressing one record in a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    /// Data page holding the record
    pub page: u32,
    /// Slot index within that page
    pub slot: u32,
}

impl Rid {
    /// Sentinel for a record not yet placed in any table
    pub const UNSET: Rid = Rid {
        page: u32::MAX,
        slot: u32::MAX,
    };

    /// Create a new record identifier
    pub const fn new(page: u32, slot: u32) -> Self {
        Self { page, slot }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::UNSET {
            write!(f, "(unset)")
        } else {
            write!(f, "({}, {})", self.page, self.slot)
        }
    }
}
