//! Schema catalog: the chain of pages holding every table definition,
//! starting at the header's `schema_root`.

pub mod table_schema;

pub use table_schema::{SchemaColumn, TableId, TableSchema, MAX_COLUMNS, MAX_NAME_LEN};

use crate::codec::{decode_schema, encode_schema, schema_encoded_len};
use crate::storage::chain::{self, Located};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::storage::pager::Pager;
use log::debug;

pub struct Catalog<'a> {
    pager: &'a mut Pager,
}

impl<'a> Catalog<'a> {
    pub fn new(pager: &'a mut Pager) -> Self {
        Self { pager }
    }

    fn schema_root(&self) -> StorageResult<PageId> {
        self.pager
            .header()
            .schema_root()
            .ok_or_else(|| StorageError::InvalidHeader {
                reason: "Header has no schema root".to_string(),
            })
    }

    fn locate(&mut self, table_id: TableId) -> StorageResult<Option<Located<TableSchema>>> {
        let root = self.schema_root()?;
        chain::find(self.pager, Some(root), decode_schema, |s| s.table_id == table_id)
    }

    fn locate_existing(&mut self, table_id: TableId) -> StorageResult<Located<TableSchema>> {
        self.locate(table_id)?
            .ok_or(StorageError::TableNotFound { table_id: table_id.0 })
    }

    /// Store a new table definition and return its id. An unset id is taken
    /// from the header's global counter; an explicit one must not be in use.
    pub fn write_table_schema(&mut self, schema: &mut TableSchema) -> StorageResult<TableId> {
        schema.validate()?;
        chain::check_entry_size(schema_encoded_len(schema))?;

        let root = self.schema_root()?;
        let clash = chain::find(self.pager, Some(root), decode_schema, |existing| {
            existing.table_name == schema.table_name
                || (!schema.table_id.is_unset() && existing.table_id == schema.table_id)
        })?;
        if let Some(existing) = clash {
            return Err(if existing.value.table_name == schema.table_name {
                StorageError::DuplicateTableName {
                    name: schema.table_name.clone(),
                }
            } else {
                StorageError::DuplicateTableId {
                    table_id: schema.table_id.0,
                }
            });
        }

        if schema.table_id.is_unset() {
            schema.table_id = TableId(self.pager.header_mut().allocate_table_id()?);
        } else {
            self.pager.header_mut().reserve_table_id(schema.table_id.0)?;
        }

        let (page_id, _) = chain::append_first_fit(self.pager, root, &encode_schema(schema))?;
        debug!(
            "Wrote schema for table '{}' (id {}) to page {}",
            schema.table_name, schema.table_id, page_id
        );

        Ok(schema.table_id)
    }

    pub fn read_table_schema(&mut self, table_id: TableId) -> StorageResult<Option<TableSchema>> {
        Ok(self.locate(table_id)?.map(|located| located.value))
    }

    pub fn read_table_schema_by_name(&mut self, name: &str) -> StorageResult<Option<TableSchema>> {
        let root = self.schema_root()?;
        let found = chain::find(self.pager, Some(root), decode_schema, |s| s.table_name == name)?;
        Ok(found.map(|located| located.value))
    }

    /// All table definitions in chain order.
    pub fn read_all_table_schemas(&mut self) -> StorageResult<Vec<TableSchema>> {
        let root = self.schema_root()?;
        chain::collect(self.pager, Some(root), decode_schema)
    }

    pub fn delete_table_schema(&mut self, table_id: TableId) -> StorageResult<()> {
        let located = self.locate_existing(table_id)?;
        chain::remove(self.pager, &located)?;
        debug!("Deleted schema of table {} from page {}", table_id, located.page_id);
        Ok(())
    }

    /// Persist a changed definition under its existing id. Same-sized entries
    /// are overwritten where they are; otherwise the entry is rewritten.
    pub fn update_table_schema(&mut self, schema: &TableSchema) -> StorageResult<()> {
        schema.validate()?;
        let located = self.locate_existing(schema.table_id)?;
        if located.value.table_name != schema.table_name
            && self.read_table_schema_by_name(&schema.table_name)?.is_some()
        {
            return Err(StorageError::DuplicateTableName {
                name: schema.table_name.clone(),
            });
        }

        let encoded = encode_schema(schema);

        if encoded.len() == located.len {
            return chain::overwrite(self.pager, &located, &encoded);
        }

        chain::check_entry_size(encoded.len())?;
        chain::remove(self.pager, &located)?;
        let root = self.schema_root()?;
        chain::append_first_fit(self.pager, root, &encoded)?;
        Ok(())
    }

    /// Read, change and rewrite one schema. `change` runs before anything
    /// is deleted, so a rejected change leaves the catalog untouched.
    fn modify_columns(
        &mut self,
        table_id: TableId,
        change: impl FnOnce(&mut Vec<SchemaColumn>) -> StorageResult<()>,
    ) -> StorageResult<TableSchema> {
        let mut schema = self
            .read_table_schema(table_id)?
            .ok_or(StorageError::TableNotFound { table_id: table_id.0 })?;

        change(&mut schema.columns)?;
        schema.validate()?;
        chain::check_entry_size(schema_encoded_len(&schema))?;

        self.delete_table_schema(table_id)?;
        self.write_table_schema(&mut schema)?;
        Ok(schema)
    }

    pub fn add_column_to_table(
        &mut self,
        table_id: TableId,
        column: SchemaColumn,
    ) -> StorageResult<TableSchema> {
        self.modify_columns(table_id, |columns| {
            if columns.len() >= MAX_COLUMNS {
                return Err(StorageError::TooManyColumns {
                    count: columns.len() + 1,
                    max: MAX_COLUMNS,
                });
            }
            columns.push(column);
            Ok(())
        })
    }

    pub fn remove_column_from_table(
        &mut self,
        table_id: TableId,
        index: usize,
    ) -> StorageResult<TableSchema> {
        self.modify_columns(table_id, |columns| {
            check_column_index(columns, index)?;
            columns.remove(index);
            Ok(())
        })
    }

    pub fn update_table_column(
        &mut self,
        table_id: TableId,
        index: usize,
        column: SchemaColumn,
    ) -> StorageResult<TableSchema> {
        self.modify_columns(table_id, |columns| {
            check_column_index(columns, index)?;
            columns[index] = column;
            Ok(())
        })
    }
}

fn check_column_index(columns: &[SchemaColumn], index: usize) -> StorageResult<()> {
    if index >= columns.len() {
        return Err(StorageError::ColumnIndexOutOfBounds {
            index,
            count: columns.len(),
        });
    }
    Ok(())
}
