//! In-order B+ tree scans.
//!
//! A scan descends to the leftmost leaf and then walks the sibling
//! chain, yielding entries in ascending key order. The entry index
//! starts at -1 so the first advance lands on the leaf's first entry.

use crate::btree::node::Node;
use crate::btree::BTreeIndex;
use crate::error::{Result, StorageError};
use crate::types::{PageId, Rid};

/// In-progress in-order scan over a B+ tree
pub struct TreeScan<'a> {
    tree: &'a mut BTreeIndex,
    /// Leaf currently being read; `None` once the chain is exhausted
    current: Option<PageId>,
    /// Index of the entry returned last, -1 before the first advance
    entry: isize,
}

impl<'a> TreeScan<'a> {
    /// Open a scan positioned before the tree's smallest key
    pub(crate) fn open(tree: &'a mut BTreeIndex) -> Result<Self> {
        let mut current = tree.root_page();
        loop {
            match tree.read_node(current)? {
                Node::Internal(node) => current = node.children[0],
                Node::Leaf(_) => break,
            }
        }

        Ok(Self {
            tree,
            current: Some(current),
            entry: -1,
        })
    }

    /// Produce the next entry in key order, or `None` at the end
    pub fn next_entry(&mut self) -> Result<Option<(i32, Rid)>> {
        loop {
            let Some(page) = self.current else {
                return Ok(None);
            };
            let Node::Leaf(leaf) = self.tree.read_node(page)? else {
                return Err(StorageError::invalid_metadata(format!(
                    "page {page} on the leaf chain is not a leaf"
                )));
            };

            self.entry += 1;
            let idx = self.entry as usize;
            if idx < leaf.keys.len() {
                return Ok(Some((leaf.keys[idx], leaf.rids[idx])));
            }

            self.current = leaf.next_leaf;
            self.entry = -1;
        }
    }
}
