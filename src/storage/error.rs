//! Storage layer error types.

use crate::storage::page::PageId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the storage engine.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database file already exists at {}", .path.display())]
    DatabaseExists { path: PathBuf },

    #[error("Database file does not exist at {}", .path.display())]
    DatabaseMissing { path: PathBuf },

    #[error("Table {table_id} not found")]
    TableNotFound { table_id: u16 },

    #[error("Table {table_id} already exists")]
    DuplicateTableId { table_id: u16 },

    #[error("Table '{name}' already exists")]
    DuplicateTableName { name: String },

    #[error("Record {record_id} not found in table {table_id}")]
    RecordNotFound { table_id: u16, record_id: u64 },

    #[error("Record {record_id} already exists in table {table_id}")]
    DuplicateRecordId { table_id: u16, record_id: u64 },

    #[error("Page not resident in cache: {0}")]
    PageNotResident(PageId),

    #[error("Page cache is full: no frame available for eviction")]
    CacheExhausted,

    #[error("Too many columns: {count} (max: {max})")]
    TooManyColumns { count: usize, max: usize },

    #[error("Name '{name}' is too long: {len} bytes (max: {max})")]
    NameTooLong { name: String, len: usize, max: usize },

    #[error("Text value too long: {len} bytes (max: {max})")]
    TextTooLong { len: usize, max: usize },

    #[error("Column index {index} out of bounds (column count: {count})")]
    ColumnIndexOutOfBounds { index: usize, count: usize },

    #[error("Field count {actual} doesn't match column count {expected}")]
    FieldCountMismatch { expected: usize, actual: usize },

    #[error("Value for column '{column}' is not compatible with type {expected}")]
    TypeMismatch { column: String, expected: String },

    #[error("Column '{column}' is not nullable")]
    NullNotAllowed { column: String },

    #[error("Entry of {size} bytes can never fit in a page (max: {max})")]
    EntryTooLarge { size: usize, max: usize },

    #[error("Page is full: requires {required} bytes but only {available} available")]
    PageFull { required: usize, available: usize },

    #[error("Record {record_id} would grow from {old_size} to {new_size} bytes")]
    RecordTooLarge {
        record_id: u64,
        old_size: usize,
        new_size: usize,
    },

    #[error("Record belongs to table {actual}, expected {expected}")]
    TableMismatch { expected: u16, actual: u16 },

    #[error("Invalid database header: {reason}")]
    InvalidHeader { reason: String },

    #[error("Corrupted entry on page {page_id}: {reason}")]
    CorruptedEntry { page_id: PageId, reason: String },

    #[error("Page id space exhausted")]
    PageIdOverflow,

    #[error("Table id space exhausted")]
    TableIdOverflow,

    #[error("Record id space exhausted in table {table_id}")]
    RecordIdOverflow { table_id: u16 },
}

impl StorageError {
    /// Missing tables, records and pages are a normal outcome rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::TableNotFound { .. }
                | StorageError::RecordNotFound { .. }
                | StorageError::PageNotResident(_)
        )
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
