//! Table definitions stored in the schema chain.

use crate::access::record::Record;
use crate::access::value::{DataType, Value, MAX_TEXT_LEN};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use std::fmt;

pub const MAX_COLUMNS: usize = 16;
pub const MAX_NAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u16);

impl TableId {
    /// Placeholder for a schema that has not been written yet.
    pub const UNSET: TableId = TableId(0);

    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl SchemaColumn {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table_id: TableId,
    pub table_name: String,
    /// First page of the record chain, None until the first insert.
    pub root_page: Option<PageId>,
    /// Id handed to the next record inserted without an explicit id.
    pub next_record_id: u64,
    pub columns: Vec<SchemaColumn>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>, columns: Vec<SchemaColumn>) -> Self {
        Self {
            table_id: TableId::UNSET,
            table_name: table_name.into(),
            root_page: None,
            next_record_id: 1,
            columns,
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Reject definitions that exceed the fixed limits of the entry format.
    pub fn validate(&self) -> StorageResult<()> {
        if self.columns.len() > MAX_COLUMNS {
            return Err(StorageError::TooManyColumns {
                count: self.columns.len(),
                max: MAX_COLUMNS,
            });
        }

        validate_name(&self.table_name)?;
        for column in &self.columns {
            validate_name(&column.name)?;
        }

        Ok(())
    }

    /// Check that a record matches this table's columns one for one.
    pub fn validate_record(&self, record: &Record) -> StorageResult<()> {
        if record.fields.len() != self.columns.len() {
            return Err(StorageError::FieldCountMismatch {
                expected: self.columns.len(),
                actual: record.fields.len(),
            });
        }

        for (column, field) in self.columns.iter().zip(&record.fields) {
            if field.data_type != column.data_type || !field.value.is_compatible_with(column.data_type)
            {
                return Err(StorageError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.data_type.to_string(),
                });
            }

            match &field.value {
                Value::Null if !column.nullable => {
                    return Err(StorageError::NullNotAllowed {
                        column: column.name.clone(),
                    });
                }
                Value::Text(text) if text.len() > MAX_TEXT_LEN => {
                    return Err(StorageError::TextTooLong {
                        len: text.len(),
                        max: MAX_TEXT_LEN,
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn validate_name(name: &str) -> StorageResult<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(StorageError::NameTooLong {
            name: name.to_string(),
            len: name.len(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}
