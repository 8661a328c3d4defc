use crate::access::{Record, RecordHeap};
use crate::catalog::{Catalog, SchemaColumn, TableId, TableSchema};
use crate::storage::buffer::{PageCache, DEFAULT_CACHE_CAPACITY};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::header::{Header, Version};
use crate::storage::pager::Pager;
use log::{info, warn};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings applied when a database file is created or opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Number of pages the cache keeps resident.
    pub cache_capacity: usize,
    /// Version stamped into new files and expected from existing ones.
    pub version: Version,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            version: Version::CURRENT,
        }
    }
}

impl DatabaseConfig {
    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}

/// High-level database interface over one file
pub struct Database {
    pager: Pager,
    config: DatabaseConfig,
    path: PathBuf,
    closed: bool,
}

impl Database {
    /// Create a new database at the specified path
    pub fn create(path: &Path) -> StorageResult<Self> {
        Self::create_with_config(path, DatabaseConfig::default())
    }

    pub fn create_with_config(path: &Path, config: DatabaseConfig) -> StorageResult<Self> {
        if path.exists() {
            return Err(StorageError::DatabaseExists {
                path: path.to_path_buf(),
            });
        }

        let pager = Pager::create(path, config.cache_capacity, config.version)?;
        info!(
            "Created database {} (version {})",
            path.display(),
            config.version
        );

        Ok(Self {
            pager,
            config,
            path: path.to_path_buf(),
            closed: false,
        })
    }

    /// Open an existing database
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with_config(path, DatabaseConfig::default())
    }

    pub fn open_with_config(path: &Path, config: DatabaseConfig) -> StorageResult<Self> {
        if !path.exists() {
            return Err(StorageError::DatabaseMissing {
                path: path.to_path_buf(),
            });
        }

        let pager = Pager::open(path, config.cache_capacity)?;
        let file_version = pager.header().version;
        if file_version.major != config.version.major {
            warn!(
                "Database {} was written by version {}, this is version {}",
                path.display(),
                file_version,
                config.version
            );
        }
        info!(
            "Opened database {} ({} pages)",
            path.display(),
            pager.header().page_count
        );

        Ok(Self {
            pager,
            config,
            path: path.to_path_buf(),
            closed: false,
        })
    }

    pub fn open_or_create(path: &Path, config: DatabaseConfig) -> StorageResult<Self> {
        if path.exists() {
            Self::open_with_config(path, config)
        } else {
            Self::create_with_config(path, config)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn header(&self) -> &Header {
        self.pager.header()
    }

    pub fn cache(&self) -> &PageCache {
        self.pager.cache()
    }

    pub fn catalog(&mut self) -> Catalog<'_> {
        Catalog::new(&mut self.pager)
    }

    pub fn records(&mut self) -> RecordHeap<'_> {
        RecordHeap::new(&mut self.pager)
    }

    /// Rewrite the header page. Dirty pages are flushed first so the header
    /// never refers to pages that have not been written.
    pub fn write_header(&mut self) -> StorageResult<()> {
        self.pager.flush_all()?;
        self.pager.write_header()
    }

    pub fn flush_all_dirty_pages(&mut self) -> StorageResult<()> {
        self.pager.flush_all()
    }

    /// Flush all dirty pages, rewrite the header and sync the file.
    pub fn flush(&mut self) -> StorageResult<()> {
        self.pager.sync()
    }

    pub fn close(mut self) -> StorageResult<()> {
        self.closed = true;
        self.pager.sync()?;
        info!("Closed database {}", self.path.display());
        Ok(())
    }

    /// Create a table from column definitions and return its id
    pub fn create_table(
        &mut self,
        name: &str,
        columns: Vec<SchemaColumn>,
    ) -> StorageResult<TableId> {
        self.write_table_schema(&mut TableSchema::new(name, columns))
    }

    pub fn write_table_schema(&mut self, schema: &mut TableSchema) -> StorageResult<TableId> {
        self.catalog().write_table_schema(schema)
    }

    pub fn read_table_schema(&mut self, table_id: TableId) -> StorageResult<Option<TableSchema>> {
        self.catalog().read_table_schema(table_id)
    }

    pub fn read_table_schema_by_name(&mut self, name: &str) -> StorageResult<Option<TableSchema>> {
        self.catalog().read_table_schema_by_name(name)
    }

    pub fn read_all_table_schemas(&mut self) -> StorageResult<Vec<TableSchema>> {
        self.catalog().read_all_table_schemas()
    }

    pub fn delete_table_schema(&mut self, table_id: TableId) -> StorageResult<()> {
        self.catalog().delete_table_schema(table_id)
    }

    pub fn add_column_to_table(
        &mut self,
        table_id: TableId,
        column: SchemaColumn,
    ) -> StorageResult<TableSchema> {
        self.catalog().add_column_to_table(table_id, column)
    }

    pub fn remove_column_from_table(
        &mut self,
        table_id: TableId,
        index: usize,
    ) -> StorageResult<TableSchema> {
        self.catalog().remove_column_from_table(table_id, index)
    }

    pub fn update_table_column(
        &mut self,
        table_id: TableId,
        index: usize,
        column: SchemaColumn,
    ) -> StorageResult<TableSchema> {
        self.catalog().update_table_column(table_id, index, column)
    }

    pub fn insert_record(&mut self, record: &mut Record) -> StorageResult<u64> {
        self.records().insert_record(record)
    }

    pub fn read_record(
        &mut self,
        table_id: TableId,
        record_id: u64,
    ) -> StorageResult<Option<Record>> {
        self.records().read_record(table_id, record_id)
    }

    pub fn update_record(&mut self, record: &Record) -> StorageResult<()> {
        self.records().update_record(record)
    }

    pub fn delete_record(&mut self, table_id: TableId, record_id: u64) -> StorageResult<()> {
        self.records().delete_record(table_id, record_id)
    }

    pub fn read_all_records(&mut self, table_id: TableId) -> StorageResult<Vec<Record>> {
        self.records().read_all_records(table_id)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Best effort flush on drop
        if let Err(e) = self.pager.sync() {
            warn!("Failed to flush {} on drop: {}", self.path.display(), e);
        }
    }
}

/// Cloneable handle that serialises all access to one database behind a
/// single lock.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn new(database: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(database)),
        }
    }

    /// Run `f` while holding the database lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut Database) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}
