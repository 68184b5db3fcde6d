//! Heap-file tables.
//!
//! A table is a page file whose page 0 carries a textual metadata header
//! (tuple count, free-page hint, schema) and whose pages 1..N hold
//! fixed-size record slots. Each slot is one tag byte (`'1'` occupied,
//! `'0'` or zero free) followed by the record payload.

use crate::buffer::{BufferPool, ReplacementPolicy};
use crate::error::{Result, StorageError};
use crate::record::{Predicate, Record, Schema, TableScan};
use crate::storage::PageFile;
use crate::types::{PageId, Rid, PAGE_SIZE};
use log::debug;
use std::path::Path;

/// Frames in a table's buffer pool
const TABLE_POOL_FRAMES: usize = 3;

/// An open heap-file table
pub struct Table {
    pub(crate) pool: BufferPool,
    pub(crate) schema: Schema,
    pub(crate) tuple_count: u64,
    /// Lowest page that may have a free slot; insertion starts here
    free_page_hint: Option<PageId>,
}

impl Table {
    /// Create a new table file for `schema` at `path`.
    ///
    /// Fails with `InvalidMetadata` if one record slot would not fit in a
    /// page.
    pub fn create(path: impl AsRef<Path>, schema: &Schema) -> Result<()> {
        let slot_size = schema.record_size() + 1;
        if slot_size > PAGE_SIZE {
            return Err(StorageError::invalid_metadata(format!(
                "record slot of {slot_size} bytes does not fit in a page"
            )));
        }

        PageFile::create(path.as_ref())?;
        let mut pool = BufferPool::new(path.as_ref(), TABLE_POOL_FRAMES, ReplacementPolicy::Lru)?;
        Self::write_metadata(&mut pool, 0, None, schema)?;
        pool.close()?;
        debug!("created table {}", path.as_ref().display());
        Ok(())
    }

    /// Open an existing table
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut pool = BufferPool::new(path.as_ref(), TABLE_POOL_FRAMES, ReplacementPolicy::Lru)?;

        let handle = pool.pin_page(PageId::new(0))?;
        let parsed = Self::parse_metadata(pool.page(&handle));
        pool.unpin_page(&handle)?;
        let (tuple_count, free_page_hint, schema) = parsed?;

        debug!(
            "opened table {} ({} tuples)",
            path.as_ref().display(),
            tuple_count
        );
        Ok(Self {
            pool,
            schema,
            tuple_count,
            free_page_hint,
        })
    }

    /// Write metadata back and close the table's buffer pool
    pub fn close(mut self) -> Result<()> {
        Self::write_metadata(
            &mut self.pool,
            self.tuple_count,
            self.free_page_hint,
            &self.schema,
        )?;
        self.pool.close()
    }

    /// Remove the table file at `path`
    pub fn delete(path: impl AsRef<Path>) -> Result<()> {
        PageFile::destroy(path)
    }

    /// The table's schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of tuples currently stored
    pub fn tuple_count(&self) -> u64 {
        self.tuple_count
    }

    /// Record slots per data page under this schema
    pub(crate) fn slots_per_page(&self) -> usize {
        PAGE_SIZE / (self.schema.record_size() + 1)
    }

    /// Insert `record`, assigning its rid.
    ///
    /// Slots are searched left to right starting at the free-page hint;
    /// the file grows when every existing data page is full.
    pub fn insert(&mut self, record: &mut Record) -> Result<()> {
        let record_size = self.schema.record_size();
        if record.data().len() != record_size {
            return Err(StorageError::type_mismatch(format!(
                "record payload is {} bytes, schema requires {record_size}",
                record.data().len()
            )));
        }

        let slot_size = record_size + 1;
        let slots = self.slots_per_page();
        let mut page = self.free_page_hint.map(|p| p.value()).unwrap_or(1).max(1);

        loop {
            let handle = self.pool.pin_page(PageId::new(page))?;
            let data = self.pool.page(&handle);
            let free_slot = (0..slots).find(|&slot| data[slot * slot_size] != b'1');

            if let Some(slot) = free_slot {
                let offset = slot * slot_size;
                let data = self.pool.page_mut(&handle);
                data[offset] = b'1';
                data[offset + 1..offset + 1 + record_size].copy_from_slice(record.data());
                record.id = Rid::new(page, slot as u32);

                self.pool.mark_dirty(&handle)?;
                self.pool.unpin_page(&handle)?;
                self.tuple_count += 1;
                self.free_page_hint = Some(PageId::new(page));
                return Ok(());
            }

            self.pool.unpin_page(&handle)?;
            page += 1;
        }
    }

    /// Remove the record at `rid`, freeing its slot
    pub fn delete_record(&mut self, rid: Rid) -> Result<()> {
        let record_size = self.schema.record_size();
        let offset = self.slot_offset(rid)?;

        let handle = self.pool.pin_page(PageId::new(rid.page))?;
        if self.pool.page(&handle)[offset] != b'1' {
            self.pool.unpin_page(&handle)?;
            return Err(StorageError::RecordNotFound(rid));
        }

        let data = self.pool.page_mut(&handle);
        data[offset..offset + 1 + record_size].fill(0);
        data[offset] = b'0';
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin_page(&handle)?;

        self.tuple_count = self.tuple_count.saturating_sub(1);
        let freed = PageId::new(rid.page);
        match self.free_page_hint {
            Some(hint) if hint <= freed => {}
            _ => self.free_page_hint = Some(freed),
        }
        Ok(())
    }

    /// Overwrite the record at `record.id` with `record`'s payload
    pub fn update(&mut self, record: &Record) -> Result<()> {
        let record_size = self.schema.record_size();
        if record.data().len() != record_size {
            return Err(StorageError::type_mismatch(format!(
                "record payload is {} bytes, schema requires {record_size}",
                record.data().len()
            )));
        }
        let offset = self.slot_offset(record.id)?;

        let handle = self.pool.pin_page(PageId::new(record.id.page))?;
        let data = self.pool.page_mut(&handle);
        data[offset] = b'1';
        data[offset + 1..offset + 1 + record_size].copy_from_slice(record.data());
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin_page(&handle)?;
        Ok(())
    }

    /// Read the record at `rid`.
    ///
    /// Fails with `RecordNotFound` when the slot is out of range or not
    /// occupied.
    pub fn get(&mut self, rid: Rid) -> Result<Record> {
        let record_size = self.schema.record_size();
        let offset = self.slot_offset(rid)?;

        let handle = self.pool.pin_page(PageId::new(rid.page))?;
        let data = self.pool.page(&handle);
        if data[offset] != b'1' {
            self.pool.unpin_page(&handle)?;
            return Err(StorageError::RecordNotFound(rid));
        }
        let payload = data[offset + 1..offset + 1 + record_size].to_vec();
        self.pool.unpin_page(&handle)?;

        Ok(Record::from_payload(rid, payload))
    }

    /// Start a scan over the table, optionally filtered by `predicate`
    pub fn scan(&mut self, predicate: Option<Predicate>) -> TableScan<'_> {
        TableScan::new(self, predicate)
    }

    /// Byte offset of `rid`'s slot within its page.
    ///
    /// Fails with `RecordNotFound` for the metadata page or an
    /// out-of-range slot index.
    fn slot_offset(&self, rid: Rid) -> Result<usize> {
        if rid.page == 0 || rid.slot as usize >= self.slots_per_page() {
            return Err(StorageError::RecordNotFound(rid));
        }
        Ok(rid.slot as usize * (self.schema.record_size() + 1))
    }

    fn write_metadata(
        pool: &mut BufferPool,
        tuple_count: u64,
        free_page_hint: Option<PageId>,
        schema: &Schema,
    ) -> Result<()> {
        let free = free_page_hint.map(|p| p.value() as i64).unwrap_or(-1);
        let text = format!("{tuple_count}\n{free}\n{}\n", schema.to_metadata_line());
        if text.len() > PAGE_SIZE {
            return Err(StorageError::invalid_metadata(
                "table metadata does not fit in one page",
            ));
        }

        let handle = pool.pin_page(PageId::new(0))?;
        let page = pool.page_mut(&handle);
        page.fill(0);
        page[..text.len()].copy_from_slice(text.as_bytes());
        pool.mark_dirty(&handle)?;
        pool.unpin_page(&handle)
    }

    fn parse_metadata(page: &[u8]) -> Result<(u64, Option<PageId>, Schema)> {
        let text = String::from_utf8_lossy(page);
        let mut lines = text.lines();

        let tuple_count = lines
            .next()
            .and_then(|l| l.trim().parse::<u64>().ok())
            .ok_or_else(|| StorageError::invalid_metadata("missing tuple count"))?;
        let free = lines
            .next()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .ok_or_else(|| StorageError::invalid_metadata("missing free page field"))?;
        let schema_line = lines
            .next()
            .ok_or_else(|| StorageError::invalid_metadata("missing schema line"))?
            .trim_end_matches('\0');
        let schema = Schema::from_metadata_line(schema_line)?;

        let free_page_hint = (free >= 0).then(|| PageId::new(free as u32));
        Ok((tuple_count, free_page_hint, schema))
    }
}
