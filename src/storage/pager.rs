use crate::storage::buffer::PageCache;
use crate::storage::disk::PageStore;
use crate::storage::error::StorageResult;
use crate::storage::header::{Header, Version, INITIAL_SCHEMA_ROOT};
use crate::storage::page::{PackedPage, PageId, PAGE_SIZE};
use log::debug;
use std::path::Path;

/// The file header together with the page cache. Catalog and record chains do
/// all page access through this type; only the header bypasses the cache.
pub struct Pager {
    header: Header,
    cache: PageCache,
}

impl Pager {
    /// Create a new file holding a header and an empty schema root page.
    pub fn create(path: &Path, cache_capacity: usize, version: Version) -> StorageResult<Self> {
        let store = PageStore::create(path)?;
        let mut pager = Self {
            header: Header::new(version),
            cache: PageCache::new(store, cache_capacity),
        };

        pager.with_page_mut(INITIAL_SCHEMA_ROOT, |data| {
            PackedPage::new(&mut data[..]);
            Ok(())
        })?;
        pager.sync()?;

        Ok(pager)
    }

    pub fn open(path: &Path, cache_capacity: usize) -> StorageResult<Self> {
        let mut store = PageStore::open(path)?;
        let mut buf = Box::new([0u8; PAGE_SIZE]);
        store.read_page(PageId::HEADER, &mut buf)?;
        let header = Header::from_bytes(&buf[..])?;

        Ok(Self {
            header,
            cache: PageCache::new(store, cache_capacity),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Run `f` over a page without marking it dirty.
    pub fn with_page<R>(
        &mut self,
        page_id: PageId,
        f: impl FnOnce(&[u8; PAGE_SIZE]) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let data = self.cache.fetch(page_id)?;
        f(data)
    }

    /// Run `f` over a page and mark it dirty if `f` succeeds.
    pub fn with_page_mut<R>(
        &mut self,
        page_id: PageId,
        f: impl FnOnce(&mut [u8; PAGE_SIZE]) -> StorageResult<R>,
    ) -> StorageResult<R> {
        let data = self.cache.fetch(page_id)?;
        let result = f(data)?;
        self.cache.mark_dirty(page_id)?;
        Ok(result)
    }

    /// Take the next page number from the header and format it as an empty
    /// packed page.
    pub fn allocate_page(&mut self) -> StorageResult<PageId> {
        let page_id = self.header.allocate_page()?;
        self.with_page_mut(page_id, |data| {
            PackedPage::new(&mut data[..]);
            Ok(())
        })?;

        debug!("Allocated page {}", page_id);
        Ok(page_id)
    }

    pub fn write_header(&mut self) -> StorageResult<()> {
        let bytes = self.header.to_bytes();
        self.cache.store_mut().write_page(PageId::HEADER, &bytes)
    }

    pub fn flush_all(&mut self) -> StorageResult<()> {
        self.cache.flush_all()
    }

    /// Flush every dirty page and only then rewrite the header, so the header
    /// never points at pages that have not reached the file.
    pub fn sync(&mut self) -> StorageResult<()> {
        self.flush_all()?;
        self.write_header()?;
        self.cache.store_mut().sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::PACKED_HEADER_SIZE;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_create_initializes_schema_root() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("test.pdb");

        let mut pager = Pager::create(&path, 4, Version::CURRENT)?;
        assert_eq!(pager.header().page_count, 2);

        let free = pager.with_page(INITIAL_SCHEMA_ROOT, |data| {
            let page = PackedPage::from_data(&data[..]);
            Ok((page.entry_count(), page.free_space_offset()))
        })?;
        assert_eq!(free, (0, PACKED_HEADER_SIZE));

        Ok(())
    }

    #[test]
    fn test_reopen_reads_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("test.pdb");

        {
            let mut pager = Pager::create(&path, 4, Version::new(1, 4, 2))?;
            pager.allocate_page()?;
            pager.allocate_page()?;
            pager.sync()?;
        }

        let pager = Pager::open(&path, 4)?;
        assert_eq!(pager.header().page_count, 4);
        assert_eq!(pager.header().version, Version::new(1, 4, 2));

        Ok(())
    }

    #[test]
    fn test_allocate_page_marks_formatted_page_dirty() -> Result<()> {
        let dir = tempdir()?;
        let mut pager = Pager::create(&dir.path().join("test.pdb"), 4, Version::CURRENT)?;

        let page_id = pager.allocate_page()?;
        assert_eq!(page_id, PageId(2));
        assert!(pager.cache().is_dirty(page_id));

        Ok(())
    }

    #[test]
    fn test_failed_mutation_is_not_marked_dirty() -> Result<()> {
        let dir = tempdir()?;
        let mut pager = Pager::create(&dir.path().join("test.pdb"), 4, Version::CURRENT)?;

        let result: StorageResult<()> = pager.with_page_mut(PageId(1), |data| {
            PackedPage::from_data(&mut data[..]).append(&vec![0u8; PAGE_SIZE])?;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!pager.cache().is_dirty(PageId(1)));

        Ok(())
    }

    #[test]
    fn test_open_rejects_foreign_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("foreign.pdb");
        std::fs::write(&path, b"definitely not a database")?;

        assert!(Pager::open(&path, 4).is_err());
        Ok(())
    }
}
