pub mod access;
pub mod catalog;
pub mod codec;
pub mod database;
pub mod storage;

pub use access::{DataType, Record, RecordField, Value};
pub use catalog::{SchemaColumn, TableId, TableSchema};
pub use database::{Database, DatabaseConfig, SharedDatabase};
pub use storage::{StorageError, StorageResult};
