//! # Paged Storage Engine
//!
//! A single-user, embedded paged storage engine built from three layered
//! components:
//!
//! - **Storage Layer** (`storage`): fixed-size page files on disk
//! - **Buffer Pool** (`buffer`): a fixed-frame page cache with five
//!   replacement policies (FIFO, LRU, CLOCK, LFU, LRU-K), pin counting,
//!   and dirty tracking
//! - **Access Methods**: a heap-file record manager with predicate scans
//!   (`record`) and a disk-resident B+ tree over integer keys (`btree`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paged_storage::{Attribute, DataType, Record, Schema, Table, Value};
//!
//! let schema = Schema::new(
//!     vec![
//!         Attribute::new("id", DataType::Int),
//!         Attribute::new("name", DataType::Text { len: 16 }),
//!     ],
//!     vec![0],
//! )?;
//!
//! Table::create("people.tbl", &schema)?;
//! let mut table = Table::open("people.tbl")?;
//!
//! let mut rec = Record::new(&schema);
//! rec.set_attr(&schema, 0, &Value::Int(1))?;
//! rec.set_attr(&schema, 1, &Value::Text("Ada".into()))?;
//! table.insert(&mut rec)?;
//!
//! let fetched = table.get(rec.id)?;
//! table.close()?;
//! ```

pub mod btree;
pub mod buffer;
pub mod error;
pub mod record;
pub mod storage;
pub mod types;

pub use error::{Result, StorageError};
pub use types::{DataType, PageId, Rid, Value, PAGE_SIZE};

// Re-export the main public API
pub use btree::{BTreeIndex, TreeScan};
pub use buffer::{BufferPool, PageHandle, ReplacementPolicy};
pub use record::{Attribute, CompareOp, Predicate, Record, Schema, Table, TableScan};
pub use storage::PageFile;
