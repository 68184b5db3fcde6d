//! Scan predicates.
//!
//! A predicate compares one attribute of a record against a constant
//! value. Table scans treat it as opaque: given a record and its schema
//! it yields a boolean.

use crate::error::{Result, StorageError};
use crate::record::{Record, Schema};
use crate::types::Value;
use std::cmp::Ordering;

/// Comparison operator of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Compares one attribute against a constant
#[derive(Debug, Clone)]
pub struct Predicate {
    /// Index of the attribute to test
    pub attr: usize,
    /// Comparison operator
    pub op: CompareOp,
    /// Constant to compare against
    pub value: Value,
}

impl Predicate {
    /// Create a new predicate
    pub fn new(attr: usize, op: CompareOp, value: Value) -> Self {
        Self { attr, op, value }
    }

    /// Evaluate the predicate against a record.
    ///
    /// Fails with `TypeMismatch` when the attribute and the constant are
    /// not comparable.
    pub fn matches(&self, record: &Record, schema: &Schema) -> Result<bool> {
        let lhs = record.get_attr(schema, self.attr)?;
        let ord = lhs.cmp_same_type(&self.value).ok_or_else(|| {
            StorageError::type_mismatch(format!(
                "cannot compare {lhs:?} with {:?}",
                self.value
            ))
        })?;

        Ok(match self.op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        })
    }
}
