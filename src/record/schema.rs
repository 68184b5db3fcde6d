//! Table schemas.
//!
//! A schema is an ordered list of fixed-width attributes plus the indices
//! of its key attributes. The record width is the sum of the attribute
//! widths; the schema round-trips through one line of JSON stored in the
//! table's metadata page.

use crate::error::{Result, StorageError};
use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// One named, typed attribute of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Declared type (fixed width)
    pub ty: DataType,
}

impl Attribute {
    /// Create a new attribute
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered attribute list with key attribute indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    attrs: Vec<Attribute>,
    key_attrs: Vec<usize>,
}

impl Schema {
    /// Create a schema from attributes and key attribute indices.
    ///
    /// Fails with `UnknownAttribute` if a key index is out of range.
    pub fn new(attrs: Vec<Attribute>, key_attrs: Vec<usize>) -> Result<Self> {
        for &key in &key_attrs {
            if key >= attrs.len() {
                return Err(StorageError::UnknownAttribute {
                    index: key,
                    count: attrs.len(),
                });
            }
        }
        Ok(Self { attrs, key_attrs })
    }

    /// The attributes in declaration order
    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Number of attributes
    pub fn num_attrs(&self) -> usize {
        self.attrs.len()
    }

    /// Indices of the key attributes
    pub fn key_attrs(&self) -> &[usize] {
        &self.key_attrs
    }

    /// The attribute at `index`
    pub fn attr(&self, index: usize) -> Result<&Attribute> {
        self.attrs
            .get(index)
            .ok_or(StorageError::UnknownAttribute {
                index,
                count: self.attrs.len(),
            })
    }

    /// Width in bytes of a record under this schema
    pub fn record_size(&self) -> usize {
        self.attrs.iter().map(|a| a.ty.byte_len()).sum()
    }

    /// Byte offset of attribute `index` within a record's payload
    pub fn attr_offset(&self, index: usize) -> Result<usize> {
        if index >= self.attrs.len() {
            return Err(StorageError::UnknownAttribute {
                index,
                count: self.attrs.len(),
            });
        }
        Ok(self.attrs[..index].iter().map(|a| a.ty.byte_len()).sum())
    }

    /// Serialise the schema as one line of text for the metadata page
    pub fn to_metadata_line(&self) -> String {
        serde_json::to_string(self).expect("schema serialisation cannot fail")
    }

    /// Parse a schema from its metadata line
    pub fn from_metadata_line(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| StorageError::invalid_metadata(format!("bad schema line: {e}")))
    }
}
