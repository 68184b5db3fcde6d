//! B+ tree node pages.
//!
//! Nodes are byte-packed onto pages as little-endian 32-bit integers.
//!
//! Leaf layout:
//! ```text
//! [tag = 0][key count][next leaf (-1 if none)][(key, rid.page, rid.slot) x count]
//! ```
//!
//! Internal layout:
//! ```text
//! [tag = 1][key count][key x count][child page x (count + 1)]
//! ```
//!
//! The two variants share only the tag and key count; each owns its own
//! serialisation, and the disk layout is the contract.

use crate::error::{Result, StorageError};
use crate::types::{PageId, Rid, PAGE_SIZE};

const LEAF_TAG: i32 = 0;
const INTERNAL_TAG: i32 = 1;

/// Fixed header bytes shared by both variants (tag + key count)
const COMMON_HEADER: usize = 8;
/// Leaf header adds the next-leaf pointer
pub(crate) const LEAF_HEADER: usize = COMMON_HEADER + 4;
/// Bytes per leaf entry: key + rid page + rid slot
pub(crate) const LEAF_ENTRY: usize = 12;

/// A leaf node: sorted keys with their rids, linked to the next leaf
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LeafNode {
    pub keys: Vec<i32>,
    pub rids: Vec<Rid>,
    pub next_leaf: Option<PageId>,
}

/// An internal node: sorted separator keys with one more child than keys
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InternalNode {
    pub keys: Vec<i32>,
    pub children: Vec<PageId>,
}

impl InternalNode {
    /// Index of the child to descend into for `key`: the first child
    /// whose separator exceeds the key, else the last child
    pub fn child_index(&self, key: i32) -> usize {
        self.keys.iter().position(|&k| key < k).unwrap_or(self.keys.len())
    }
}

/// A node page, discriminated by its leading tag
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl Node {
    /// Decode a node from a page.
    ///
    /// A zeroed page decodes as an empty leaf, which is how a freshly
    /// allocated root reads before its first entry.
    pub fn read(page: &[u8]) -> Result<Node> {
        let tag = read_i32(page, 0);
        let count = read_i32(page, 4);
        if count < 0 {
            return Err(StorageError::invalid_metadata(format!(
                "negative key count {count} in node page"
            )));
        }
        let count = count as usize;

        match tag {
            LEAF_TAG => {
                if LEAF_HEADER + count * LEAF_ENTRY > PAGE_SIZE {
                    return Err(StorageError::invalid_metadata(format!(
                        "leaf key count {count} exceeds page capacity"
                    )));
                }
                let raw_next = read_i32(page, 8);
                // Node pages start at 1; page 0 is the metadata page, so
                // a zeroed next-leaf field also means "none".
                let next_leaf = (raw_next > 0).then(|| PageId::new(raw_next as u32));

                let mut keys = Vec::with_capacity(count);
                let mut rids = Vec::with_capacity(count);
                let mut offset = LEAF_HEADER;
                for _ in 0..count {
                    keys.push(read_i32(page, offset));
                    let rid_page = read_i32(page, offset + 4) as u32;
                    let rid_slot = read_i32(page, offset + 8) as u32;
                    rids.push(Rid::new(rid_page, rid_slot));
                    offset += LEAF_ENTRY;
                }
                Ok(Node::Leaf(LeafNode {
                    keys,
                    rids,
                    next_leaf,
                }))
            }
            INTERNAL_TAG => {
                if COMMON_HEADER + count * 4 + (count + 1) * 4 > PAGE_SIZE {
                    return Err(StorageError::invalid_metadata(format!(
                        "internal key count {count} exceeds page capacity"
                    )));
                }
                let mut keys = Vec::with_capacity(count);
                let mut offset = COMMON_HEADER;
                for _ in 0..count {
                    keys.push(read_i32(page, offset));
                    offset += 4;
                }
                let mut children = Vec::with_capacity(count + 1);
                for _ in 0..=count {
                    children.push(PageId::new(read_i32(page, offset) as u32));
                    offset += 4;
                }
                Ok(Node::Internal(InternalNode { keys, children }))
            }
            other => Err(StorageError::invalid_metadata(format!(
                "unknown node tag {other}"
            ))),
        }
    }

    /// Encode the node over a page, zero-filling the remainder
    pub fn write(&self, page: &mut [u8]) {
        page.fill(0);
        match self {
            Node::Leaf(leaf) => {
                debug_assert_eq!(leaf.keys.len(), leaf.rids.len());
                write_i32(page, 0, LEAF_TAG);
                write_i32(page, 4, leaf.keys.len() as i32);
                let next = leaf.next_leaf.map(|p| p.value() as i32).unwrap_or(-1);
                write_i32(page, 8, next);

                let mut offset = LEAF_HEADER;
                for (key, rid) in leaf.keys.iter().zip(&leaf.rids) {
                    write_i32(page, offset, *key);
                    write_i32(page, offset + 4, rid.page as i32);
                    write_i32(page, offset + 8, rid.slot as i32);
                    offset += LEAF_ENTRY;
                }
            }
            Node::Internal(node) => {
                debug_assert_eq!(node.children.len(), node.keys.len() + 1);
                write_i32(page, 0, INTERNAL_TAG);
                write_i32(page, 4, node.keys.len() as i32);

                let mut offset = COMMON_HEADER;
                for key in &node.keys {
                    write_i32(page, offset, *key);
                    offset += 4;
                }
                for child in &node.children {
                    write_i32(page, offset, child.value() as i32);
                    offset += 4;
                }
            }
        }
    }
}

fn read_i32(page: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(page[offset..offset + 4].try_into().unwrap())
}

fn write_i32(page: &mut [u8], offset: usize, value: i32) {
    page[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
