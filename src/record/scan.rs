//! Table scans.
//!
//! A scan walks the table's data pages in order, visiting occupied slots
//! and applying the optional predicate. The scan pins at most one page
//! at a time and releases it at every page boundary, so no pin outlives
//! a call to `next`.

use crate::error::Result;
use crate::record::{Predicate, Record, Table};
use crate::types::{PageId, Rid};

/// In-progress scan over a table
pub struct TableScan<'a> {
    table: &'a mut Table,
    predicate: Option<Predicate>,
    /// Next data page to visit
    page: u32,
    /// Next slot to visit within that page
    slot: usize,
}

impl<'a> TableScan<'a> {
    pub(crate) fn new(table: &'a mut Table, predicate: Option<Predicate>) -> Self {
        Self {
            table,
            predicate,
            page: 1,
            slot: 0,
        }
    }

    /// Produce the next matching record, or `None` when the scan is done.
    ///
    /// The page bound is derived from the table's current tuple count; at
    /// least one data page is always visited.
    pub fn next(&mut self) -> Result<Option<Record>> {
        let record_size = self.table.schema.record_size();
        let slot_size = record_size + 1;
        let slots = self.table.slots_per_page();
        let last_page = (self.table.tuple_count.div_ceil(slots as u64) as u32).max(1);

        while self.page <= last_page {
            let handle = self.table.pool.pin_page(PageId::new(self.page))?;

            while self.slot < slots {
                let offset = self.slot * slot_size;
                let data = self.table.pool.page(&handle);
                if data[offset] != b'1' {
                    self.slot += 1;
                    continue;
                }

                let rid = Rid::new(self.page, self.slot as u32);
                let payload = data[offset + 1..offset + 1 + record_size].to_vec();
                let record = Record::from_payload(rid, payload);
                self.slot += 1;

                let matched = match &self.predicate {
                    None => Ok(true),
                    Some(pred) => pred.matches(&record, &self.table.schema),
                };
                match matched {
                    Ok(true) => {
                        self.table.pool.unpin_page(&handle)?;
                        return Ok(Some(record));
                    }
                    Ok(false) => {}
                    Err(e) => {
                        self.table.pool.unpin_page(&handle)?;
                        return Err(e);
                    }
                }
            }

            self.table.pool.unpin_page(&handle)?;
            self.page += 1;
            self.slot = 0;
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::record::{Attribute, CompareOp, Schema};
    use crate::types::{DataType, Value};
    use tempfile::tempdir;

    fn people_schema() -> Schema {
        Schema::new(
            vec![
                Attribute::new("id", DataType::Int),
                Attribute::new("name", DataType::Text { len: 4 }),
                Attribute::new("age", DataType::Int),
            ],
            vec![0],
        )
        .unwrap()
    }

    fn table_with_ids(ids: &[i32]) -> Result<(tempfile::TempDir, Table)> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.tbl");
        let schema = people_schema();
        Table::create(&path, &schema)?;
        let mut table = Table::open(&path)?;
        for &id in ids {
            let mut rec = Record::new(&schema);
            rec.set_attr(&schema, 0, &Value::Int(id))?;
            rec.set_attr(&schema, 1, &Value::Text("p".into()))?;
            rec.set_attr(&schema, 2, &Value::Int(id * 2))?;
            table.insert(&mut rec)?;
        }
        Ok((dir, table))
    }

    #[test]
    fn test_scan_with_predicate() -> Result<()> {
        let ids: Vec<i32> = (1..=10).collect();
        let (_dir, mut table) = table_with_ids(&ids)?;
        let schema = people_schema();

        let pred = Predicate::new(0, CompareOp::Gt, Value::Int(7));
        let mut scan = table.scan(Some(pred));

        let mut seen = Vec::new();
        while let Some(rec) = scan.next()? {
            match rec.get_attr(&schema, 0)? {
                Value::Int(v) => seen.push(v),
                other => panic!("unexpected value {other:?}"),
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![8, 9, 10]);

        // A finished scan stays finished.
        assert!(scan.next()?.is_none());
        Ok(())
    }

    #[test]
    fn test_scan_without_predicate() -> Result<()> {
        let (_dir, mut table) = table_with_ids(&[4, 2, 9])?;

        let mut scan = table.scan(None);
        let mut count = 0;
        while scan.next()?.is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
        Ok(())
    }

    #[test]
    fn test_scan_empty_table() -> Result<()> {
        let (_dir, mut table) = table_with_ids(&[])?;
        let mut scan = table.scan(None);
        assert!(scan.next()?.is_none());
        Ok(())
    }

    #[test]
    fn test_scan_skips_deleted_slots() -> Result<()> {
        let (_dir, mut table) = table_with_ids(&[1, 2, 3, 4])?;

        // Delete record with id 2 (second inserted slot).
        table.delete_record(Rid::new(1, 1))?;

        let schema = people_schema();
        let mut scan = table.scan(None);
        let mut seen = Vec::new();
        while let Some(rec) = scan.next()? {
            if let Value::Int(v) = rec.get_attr(&schema, 0)? {
                seen.push(v);
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_scan_across_pages() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.tbl");
        // One record per slot of 2041 bytes: two slots per page.
        let schema = Schema::new(
            vec![
                Attribute::new("id", DataType::Int),
                Attribute::new("pad", DataType::Text { len: 2036 }),
            ],
            vec![0],
        )
        .unwrap();
        Table::create(&path, &schema)?;
        let mut table = Table::open(&path)?;
        assert_eq!(table.slots_per_page(), 2);

        for id in 0..5 {
            let mut rec = Record::new(&schema);
            rec.set_attr(&schema, 0, &Value::Int(id))?;
            table.insert(&mut rec)?;
        }

        let mut scan = table.scan(None);
        let mut seen = Vec::new();
        while let Some(rec) = scan.next()? {
            if let Value::Int(v) = rec.get_attr(&schema, 0)? {
                seen.push(v);
            }
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_predicate_type_error_surfaces() -> Result<()> {
        let (_dir, mut table) = table_with_ids(&[1])?;
        let pred = Predicate::new(0, CompareOp::Eq, Value::Text("one".into()));
        let mut scan = table.scan(Some(pred));
        assert!(matches!(
            scan.next(),
            Err(StorageError::TypeMismatch(_))
        ));
        Ok(())
    }
}
