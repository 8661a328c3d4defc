use crate::storage::error::StorageResult;
use crate::storage::page::{PageId, PAGE_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Raw page I/O against the database file. Page `n` lives at byte offset
/// `n * PAGE_SIZE`; this type knows nothing about what the pages contain.
pub struct PageStore {
    file: File,
    path: PathBuf,
}

impl PageStore {
    /// Create a new, empty file. Fails if something already exists at `path`.
    pub fn create(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a page into `buf`. Bytes past the end of the file read as zero, so
    /// a page that was allocated but never written comes back blank.
    pub fn read_page(&mut self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> StorageResult<()> {
        self.file.seek(SeekFrom::Start(page_id.offset()))?;

        let mut filled = 0;
        while filled < PAGE_SIZE {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buf[filled..].fill(0);

        Ok(())
    }

    pub fn write_page(&mut self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> StorageResult<()> {
        self.file.seek(SeekFrom::Start(page_id.offset()))?;
        self.file.write_all(data)?;
        self.file.flush()?;
        Ok(())
    }

    /// Force written pages to stable storage.
    pub fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Number of whole pages currently backed by the file.
    pub fn num_pages(&self) -> StorageResult<u64> {
        let file_size = self.file.metadata()?.len();
        Ok(file_size / PAGE_SIZE as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_create_and_open() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.pdb");

        {
            let store = PageStore::create(&file_path)?;
            assert_eq!(store.num_pages()?, 0);
            assert_eq!(store.path(), file_path.as_path());
        }

        {
            let store = PageStore::open(&file_path)?;
            assert_eq!(store.num_pages()?, 0);
        }

        Ok(())
    }

    #[test]
    fn test_create_existing_file_fails() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.pdb");

        let _store = PageStore::create(&file_path)?;
        assert!(PageStore::create(&file_path).is_err());

        Ok(())
    }

    #[test]
    fn test_write_and_read_page() -> Result<()> {
        let dir = tempdir()?;
        let mut store = PageStore::create(&dir.path().join("test.pdb"))?;

        let mut write_buf = Box::new([0u8; PAGE_SIZE]);
        write_buf[0] = 42;
        write_buf[PAGE_SIZE - 1] = 24;
        store.write_page(PageId(1), &write_buf)?;

        let mut read_buf = Box::new([0xFFu8; PAGE_SIZE]);
        store.read_page(PageId(1), &mut read_buf)?;

        assert_eq!(read_buf[0], 42);
        assert_eq!(read_buf[PAGE_SIZE - 1], 24);
        assert_eq!(store.num_pages()?, 2);

        Ok(())
    }

    #[test]
    fn test_read_unwritten_page_is_zeroed() -> Result<()> {
        let dir = tempdir()?;
        let mut store = PageStore::create(&dir.path().join("test.pdb"))?;

        let mut buf = Box::new([0xAAu8; PAGE_SIZE]);
        store.read_page(PageId(10), &mut buf)?;
        assert!(buf.iter().all(|&b| b == 0));

        Ok(())
    }

    #[test]
    fn test_short_read_zero_fills_tail() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.pdb");
        std::fs::write(&file_path, vec![7u8; PAGE_SIZE + 100])?;

        let mut store = PageStore::open(&file_path)?;
        let mut buf = Box::new([0xAAu8; PAGE_SIZE]);
        store.read_page(PageId(1), &mut buf)?;

        assert!(buf[..100].iter().all(|&b| b == 7));
        assert!(buf[100..].iter().all(|&b| b == 0));

        Ok(())
    }

    #[test]
    fn test_page_boundary() -> Result<()> {
        let dir = tempdir()?;
        let mut store = PageStore::create(&dir.path().join("test.pdb"))?;

        store.write_page(PageId(1), &[1u8; PAGE_SIZE])?;
        store.write_page(PageId(2), &[2u8; PAGE_SIZE])?;

        let mut read_buf = Box::new([0u8; PAGE_SIZE]);
        store.read_page(PageId(1), &mut read_buf)?;
        assert!(read_buf.iter().all(|&b| b == 1));

        store.read_page(PageId(2), &mut read_buf)?;
        assert!(read_buf.iter().all(|&b| b == 2));

        Ok(())
    }

    #[test]
    fn test_persistence() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.pdb");

        {
            let mut store = PageStore::create(&file_path)?;
            store.write_page(PageId(3), &[99u8; PAGE_SIZE])?;
            store.sync()?;
        }

        {
            let mut store = PageStore::open(&file_path)?;
            let mut buf = Box::new([0u8; PAGE_SIZE]);
            store.read_page(PageId(3), &mut buf)?;
            assert_eq!(buf[0], 99);
        }

        Ok(())
    }

    #[test]
    fn test_open_nonexistent_file() -> Result<()> {
        let dir = tempdir()?;
        let result = PageStore::open(&dir.path().join("nonexistent.pdb"));
        assert!(result.is_err());
        Ok(())
    }
}
