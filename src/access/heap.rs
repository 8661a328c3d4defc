use crate::access::record::{Record, UNSET_RECORD_ID};
use crate::catalog::{Catalog, TableId, TableSchema};
use crate::codec::{decode_record, encode_record, record_encoded_len};
use crate::storage::chain::{self, Located};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::pager::Pager;
use log::debug;

/// Records of every table, each table in its own page chain starting at the
/// schema's `root_page`.
pub struct RecordHeap<'a> {
    pager: &'a mut Pager,
}

impl<'a> RecordHeap<'a> {
    pub fn new(pager: &'a mut Pager) -> Self {
        Self { pager }
    }

    fn schema(&mut self, table_id: TableId) -> StorageResult<TableSchema> {
        Catalog::new(self.pager)
            .read_table_schema(table_id)?
            .ok_or(StorageError::TableNotFound { table_id: table_id.0 })
    }

    fn locate(
        &mut self,
        schema: &TableSchema,
        record_id: u64,
    ) -> StorageResult<Option<Located<Record>>> {
        chain::find(self.pager, schema.root_page, decode_record, |r| {
            r.record_id == record_id
        })
    }

    fn locate_existing(
        &mut self,
        schema: &TableSchema,
        record_id: u64,
    ) -> StorageResult<Located<Record>> {
        self.locate(schema, record_id)?
            .ok_or(StorageError::RecordNotFound {
                table_id: schema.table_id.0,
                record_id,
            })
    }

    /// Insert a record and return its id. Records without an id get the
    /// table's next one; the counter is persisted on the schema.
    pub fn insert_record(&mut self, record: &mut Record) -> StorageResult<u64> {
        let mut schema = self.schema(record.table_id)?;
        schema.validate_record(record)?;
        chain::check_entry_size(record_encoded_len(record))?;

        let record_id = if record.record_id == UNSET_RECORD_ID {
            schema.next_record_id
        } else if self.locate(&schema, record.record_id)?.is_some() {
            return Err(StorageError::DuplicateRecordId {
                table_id: schema.table_id.0,
                record_id: record.record_id,
            });
        } else {
            record.record_id
        };
        let next_record_id = record_id
            .checked_add(1)
            .ok_or(StorageError::RecordIdOverflow {
                table_id: schema.table_id.0,
            })?;
        schema.next_record_id = schema.next_record_id.max(next_record_id);

        let root = match schema.root_page {
            Some(root) => root,
            None => {
                let root = self.pager.allocate_page()?;
                debug!("Table {} starts its record chain at page {}", schema.table_id, root);
                schema.root_page = Some(root);
                root
            }
        };

        let stored = Record {
            record_id,
            ..record.clone()
        };
        let (page_id, _) = chain::append_first_fit(self.pager, root, &encode_record(&stored))?;
        Catalog::new(self.pager).update_table_schema(&schema)?;
        record.record_id = record_id;

        debug!(
            "Inserted record {} into table {} on page {}",
            record.record_id, schema.table_id, page_id
        );
        Ok(record.record_id)
    }

    pub fn read_record(
        &mut self,
        table_id: TableId,
        record_id: u64,
    ) -> StorageResult<Option<Record>> {
        let schema = self.schema(table_id)?;
        Ok(self.locate(&schema, record_id)?.map(|located| located.value))
    }

    /// Replace a stored record with `record`. The new encoding must not be
    /// longer than the stored one; records are never moved.
    pub fn update_record(&mut self, record: &Record) -> StorageResult<()> {
        let schema = self.schema(record.table_id)?;
        schema.validate_record(record)?;

        let located = self.locate_existing(&schema, record.record_id)?;
        if located.value.table_id != record.table_id {
            return Err(StorageError::TableMismatch {
                expected: record.table_id.0,
                actual: located.value.table_id.0,
            });
        }

        let encoded = encode_record(record);
        if encoded.len() > located.len {
            return Err(StorageError::RecordTooLarge {
                record_id: record.record_id,
                old_size: located.len,
                new_size: encoded.len(),
            });
        }

        chain::overwrite(self.pager, &located, &encoded)
    }

    pub fn delete_record(&mut self, table_id: TableId, record_id: u64) -> StorageResult<()> {
        let schema = self.schema(table_id)?;
        let located = self.locate_existing(&schema, record_id)?;
        chain::remove(self.pager, &located)?;

        debug!(
            "Deleted record {} of table {} from page {}",
            record_id, table_id, located.page_id
        );
        Ok(())
    }

    /// Every record of the table in chain order.
    pub fn read_all_records(&mut self, table_id: TableId) -> StorageResult<Vec<Record>> {
        let schema = self.schema(table_id)?;
        chain::collect(self.pager, schema.root_page, decode_record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::value::{DataType, Value};
    use crate::catalog::SchemaColumn;
    use crate::storage::header::Version;
    use crate::storage::page::PackedPage;
    use anyhow::Result;
    use tempfile::{tempdir, TempDir};

    fn create_test_table() -> Result<(TempDir, Pager, TableSchema)> {
        let dir = tempdir()?;
        let mut pager = Pager::create(&dir.path().join("heap.pdb"), 10, Version::CURRENT)?;

        let mut schema = TableSchema::new(
            "users",
            vec![
                SchemaColumn::new("id", DataType::Int, true),
                SchemaColumn::new("name", DataType::Text, false),
                SchemaColumn::new("active", DataType::Bool, true),
            ],
        );
        Catalog::new(&mut pager).write_table_schema(&mut schema)?;
        Ok((dir, pager, schema))
    }

    fn user(schema: &TableSchema, id: Option<i32>, name: &str) -> Result<Record> {
        let id = id.map_or(Value::Null, Value::Int);
        Ok(Record::from_values(schema, vec![id, name.into(), true.into()])?)
    }

    #[test]
    fn test_insert_and_read() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;
        let mut heap = RecordHeap::new(&mut pager);

        let mut record = user(&schema, None, "Alice")?;
        let record_id = heap.insert_record(&mut record)?;
        assert_eq!(record_id, 1);

        let read = heap
            .read_record(schema.table_id, record_id)?
            .expect("Record should exist");
        assert_eq!(read, record);
        assert_eq!(read.field_count(), 3);
        assert_eq!(read.value(1), Some(&Value::from("Alice")));

        assert_eq!(heap.read_record(schema.table_id, 99)?, None);
        Ok(())
    }

    #[test]
    fn test_first_insert_persists_root_page() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;
        assert_eq!(schema.root_page, None);

        RecordHeap::new(&mut pager).insert_record(&mut user(&schema, Some(1), "Bob")?)?;

        let stored = Catalog::new(&mut pager)
            .read_table_schema(schema.table_id)?
            .expect("Schema should exist");
        assert!(stored.root_page.is_some());
        assert_eq!(stored.next_record_id, 2);
        Ok(())
    }

    #[test]
    fn test_record_ids_increase() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;
        let mut heap = RecordHeap::new(&mut pager);

        let mut ids = Vec::new();
        for i in 0..10 {
            ids.push(heap.insert_record(&mut user(&schema, Some(i), "user")?)?);
        }
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        // An explicit id moves the counter past it
        let mut explicit = user(&schema, None, "explicit")?.with_record_id(100);
        heap.insert_record(&mut explicit)?;
        assert_eq!(heap.insert_record(&mut user(&schema, None, "next")?)?, 101);
        Ok(())
    }

    #[test]
    fn test_duplicate_record_id() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;
        let mut heap = RecordHeap::new(&mut pager);
        heap.insert_record(&mut user(&schema, None, "first")?)?;

        let mut again = user(&schema, None, "second")?.with_record_id(1);
        assert!(matches!(
            heap.insert_record(&mut again),
            Err(StorageError::DuplicateRecordId { record_id: 1, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_record_id_overflow() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;

        let mut last = user(&schema, None, "last")?.with_record_id(u64::MAX);
        assert!(matches!(
            RecordHeap::new(&mut pager).insert_record(&mut last),
            Err(StorageError::RecordIdOverflow { .. })
        ));
        let stored = Catalog::new(&mut pager)
            .read_table_schema(schema.table_id)?
            .expect("Schema should exist");
        assert_eq!(stored.root_page, None);

        let mut heap = RecordHeap::new(&mut pager);

        // The largest usable id exhausts the counter
        let mut high = user(&schema, None, "high")?.with_record_id(u64::MAX - 1);
        assert_eq!(heap.insert_record(&mut high)?, u64::MAX - 1);

        let mut auto = user(&schema, None, "auto")?;
        assert!(matches!(
            heap.insert_record(&mut auto),
            Err(StorageError::RecordIdOverflow { .. })
        ));
        assert_eq!(auto.record_id, UNSET_RECORD_ID);

        let ids: Vec<u64> = heap
            .read_all_records(schema.table_id)?
            .iter()
            .map(|r| r.record_id)
            .collect();
        assert_eq!(ids, vec![u64::MAX - 1]);
        Ok(())
    }

    #[test]
    fn test_rejected_insert_leaves_record_id_unset() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;
        let mut heap = RecordHeap::new(&mut pager);

        let mut too_large = user(&schema, None, &"x".repeat(5000))?;
        assert!(heap.insert_record(&mut too_large).is_err());
        assert_eq!(too_large.record_id, UNSET_RECORD_ID);

        let stored = Catalog::new(&mut pager)
            .read_table_schema(schema.table_id)?
            .expect("Schema should exist");
        assert_eq!(stored.root_page, None);
        assert_eq!(stored.next_record_id, 1);
        Ok(())
    }

    #[test]
    fn test_insert_validates_against_schema() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;
        let mut heap = RecordHeap::new(&mut pager);

        let mut null_name = Record::from_values(
            &schema,
            vec![Value::Int(1), Value::Null, Value::Bool(false)],
        )?;
        assert!(matches!(
            heap.insert_record(&mut null_name),
            Err(StorageError::NullNotAllowed { .. })
        ));

        let mut orphan = Record::new(TableId(42), vec![]);
        assert!(heap.insert_record(&mut orphan).unwrap_err().is_not_found());

        assert!(heap.read_all_records(schema.table_id)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_overflow_allocates_linked_page() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;
        let name = "n".repeat(200);
        let record_size = record_encoded_len(&user(&schema, Some(0), &name)?);
        let count = 4096 / record_size + 5;

        let mut ids = Vec::new();
        {
            let mut heap = RecordHeap::new(&mut pager);
            for i in 0..count {
                ids.push(heap.insert_record(&mut user(&schema, Some(i as i32), &name)?)?);
            }
        }

        let root = Catalog::new(&mut pager)
            .read_table_schema(schema.table_id)?
            .and_then(|s| s.root_page)
            .expect("Table should have a root page");
        let next =
            pager.with_page(root, |data| Ok(PackedPage::from_data(&data[..]).next_page()))?;
        assert!(next.is_some());

        let mut heap = RecordHeap::new(&mut pager);
        for (i, id) in ids.iter().enumerate() {
            let record = heap
                .read_record(schema.table_id, *id)?
                .expect("Record should exist");
            assert_eq!(record.value(0), Some(&Value::Int(i as i32)));
        }
        assert_eq!(heap.read_all_records(schema.table_id)?.len(), count);
        Ok(())
    }

    #[test]
    fn test_update_shrinks_in_place() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;
        let mut heap = RecordHeap::new(&mut pager);

        let mut first = user(&schema, Some(1), "Alexander")?;
        let mut second = user(&schema, Some(2), "Beatrice")?;
        heap.insert_record(&mut first)?;
        heap.insert_record(&mut second)?;

        let mut shorter = first.clone();
        shorter.fields[1].value = Value::from("Al");
        heap.update_record(&shorter)?;

        assert_eq!(heap.read_record(schema.table_id, first.record_id)?, Some(shorter));
        // The following entry is still intact
        assert_eq!(heap.read_record(schema.table_id, second.record_id)?, Some(second));
        Ok(())
    }

    #[test]
    fn test_update_rejects_growth() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;
        let mut heap = RecordHeap::new(&mut pager);

        let mut record = user(&schema, Some(1), "Al")?;
        heap.insert_record(&mut record)?;

        let mut longer = record.clone();
        longer.fields[1].value = Value::from("Alexander");
        assert!(matches!(
            heap.update_record(&longer),
            Err(StorageError::RecordTooLarge { .. })
        ));
        assert_eq!(heap.read_record(schema.table_id, record.record_id)?, Some(record));

        let missing = user(&schema, Some(1), "x")?.with_record_id(50);
        assert!(heap.update_record(&missing).unwrap_err().is_not_found());
        Ok(())
    }

    #[test]
    fn test_delete_preserves_other_records() -> Result<()> {
        let (_dir, mut pager, schema) = create_test_table()?;
        let mut heap = RecordHeap::new(&mut pager);

        let mut records = Vec::new();
        for name in ["first", "second", "third"] {
            let mut record = user(&schema, None, name)?;
            heap.insert_record(&mut record)?;
            records.push(record);
        }

        heap.delete_record(schema.table_id, records[1].record_id)?;

        let remaining = heap.read_all_records(schema.table_id)?;
        assert_eq!(remaining, vec![records[0].clone(), records[2].clone()]);
        assert_eq!(heap.read_record(schema.table_id, records[1].record_id)?, None);

        let again = heap.delete_record(schema.table_id, records[1].record_id);
        assert!(matches!(again, Err(StorageError::RecordNotFound { .. })));
        Ok(())
    }

    #[test]
    fn test_tables_have_separate_chains() -> Result<()> {
        let (_dir, mut pager, users) = create_test_table()?;
        let mut flags = TableSchema::new(
            "flags",
            vec![SchemaColumn::new("on", DataType::Bool, false)],
        );
        Catalog::new(&mut pager).write_table_schema(&mut flags)?;

        let mut heap = RecordHeap::new(&mut pager);
        heap.insert_record(&mut user(&users, None, "Alice")?)?;
        heap.insert_record(&mut Record::from_values(&flags, vec![Value::Bool(true)])?)?;
        heap.insert_record(&mut Record::from_values(&flags, vec![Value::Bool(false)])?)?;

        assert_eq!(heap.read_all_records(users.table_id)?.len(), 1);
        let flag_records = heap.read_all_records(flags.table_id)?;
        assert_eq!(flag_records.len(), 2);
        // Record ids are per table
        assert_eq!(flag_records[0].record_id, 1);
        Ok(())
    }
}
