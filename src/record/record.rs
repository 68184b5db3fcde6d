//! Records and typed attribute access.
//!
//! A record is a fixed-width byte payload laid out in schema order, plus
//! the rid it was read from or inserted at. Attribute accessors compute
//! the byte offset by summing the widths of the preceding attributes.

use crate::error::{Result, StorageError};
use crate::record::Schema;
use crate::types::{DataType, Rid, Value};

/// One tuple of a table
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Where the record lives in its table; `Rid::UNSET` before insertion
    pub id: Rid,
    data: Vec<u8>,
}

impl Record {
    /// Create an empty record sized for `schema`, with all bytes zeroed
    pub fn new(schema: &Schema) -> Self {
        Self {
            id: Rid::UNSET,
            data: vec![0u8; schema.record_size()],
        }
    }

    /// Build a record from a payload read out of a data page
    pub(crate) fn from_payload(id: Rid, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    /// The raw payload bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Read attribute `index` as a typed value.
    ///
    /// Text attributes are materialised up to their first NUL byte.
    pub fn get_attr(&self, schema: &Schema, index: usize) -> Result<Value> {
        let offset = schema.attr_offset(index)?;
        let ty = schema.attr(index)?.ty;
        let field = &self.data[offset..offset + ty.byte_len()];

        let value = match ty {
            DataType::Int => Value::Int(i32::from_le_bytes(field.try_into().unwrap())),
            DataType::Float => Value::Float(f32::from_le_bytes(field.try_into().unwrap())),
            DataType::Bool => Value::Bool(field[0] != 0),
            DataType::Text { len } => {
                let end = field.iter().position(|&b| b == 0).unwrap_or(len);
                Value::Text(String::from_utf8_lossy(&field[..end]).into_owned())
            }
        };
        Ok(value)
    }

    /// Write `value` into attribute `index`.
    ///
    /// Text values are truncated to the declared width and zero-padded.
    pub fn set_attr(&mut self, schema: &Schema, index: usize, value: &Value) -> Result<()> {
        let offset = schema.attr_offset(index)?;
        let ty = schema.attr(index)?.ty;
        let field = &mut self.data[offset..offset + ty.byte_len()];

        match (ty, value) {
            (DataType::Int, Value::Int(v)) => field.copy_from_slice(&v.to_le_bytes()),
            (DataType::Float, Value::Float(v)) => field.copy_from_slice(&v.to_le_bytes()),
            (DataType::Bool, Value::Bool(v)) => field[0] = *v as u8,
            (DataType::Text { len }, Value::Text(s)) => {
                field.fill(0);
                let n = s.len().min(len);
                field[..n].copy_from_slice(&s.as_bytes()[..n]);
            }
            (ty, value) => {
                return Err(StorageError::type_mismatch(format!(
                    "cannot store {value:?} in a {ty:?} attribute"
                )))
            }
        }
        Ok(())
    }
}
