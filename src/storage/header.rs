//! Database file header stored at page 0.
//!
//! Layout (little-endian, zero-padded to a full page):
//!
//! | offset | size | field           |
//! |--------|------|-----------------|
//! | 0      | 8    | magic           |
//! | 8      | 3    | version         |
//! | 11     | 4    | page_size       |
//! | 15     | 8    | page_count      |
//! | 23     | 8    | schema_root     |
//! | 31     | 8    | free_list_head  |
//! | 39     | 2    | next_table_id   |

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PAGE_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

pub const MAGIC: &[u8; 8] = b"PACKDB\0\0";
pub const HEADER_SIZE: usize = 41;

/// First page of the schema chain in a freshly created file.
pub const INITIAL_SCHEMA_ROOT: PageId = PageId(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const CURRENT: Version = Version::new(1, 0, 0);

    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: Version,
    pub page_size: u32,
    /// Pages allocated so far, which is also the next page number to hand out.
    pub page_count: u64,
    pub schema_root: u64,
    /// Reserved for page reuse. Always 0.
    pub free_list_head: u64,
    /// Next table id to assign. Global across all catalog pages.
    pub next_table_id: u16,
}

impl Header {
    /// Header for a new file: page 0 is this header, page 1 the first schema page.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            page_size: PAGE_SIZE as u32,
            page_count: INITIAL_SCHEMA_ROOT.0 as u64 + 1,
            schema_root: INITIAL_SCHEMA_ROOT.0 as u64,
            free_list_head: 0,
            next_table_id: 1,
        }
    }

    pub fn schema_root(&self) -> Option<PageId> {
        u32::try_from(self.schema_root).ok().and_then(PageId::from_link)
    }

    /// Hand out the next page number. Pages are never reused.
    pub fn allocate_page(&mut self) -> StorageResult<PageId> {
        let raw = u32::try_from(self.page_count).map_err(|_| StorageError::PageIdOverflow)?;
        if raw == u32::MAX {
            return Err(StorageError::PageIdOverflow);
        }
        self.page_count += 1;
        Ok(PageId(raw))
    }

    pub fn allocate_table_id(&mut self) -> StorageResult<u16> {
        let id = self.next_table_id;
        self.next_table_id = id.checked_add(1).ok_or(StorageError::TableIdOverflow)?;
        Ok(id)
    }

    /// Keep the counter ahead of an id that was chosen by the caller.
    pub fn reserve_table_id(&mut self, id: u16) -> StorageResult<()> {
        if id >= self.next_table_id {
            self.next_table_id = id.checked_add(1).ok_or(StorageError::TableIdOverflow)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Box<[u8; PAGE_SIZE]> {
        let mut buf = Box::new([0u8; PAGE_SIZE]);

        buf[0..8].copy_from_slice(MAGIC);
        buf[8] = self.version.major;
        buf[9] = self.version.minor;
        buf[10] = self.version.patch;
        LittleEndian::write_u32(&mut buf[11..15], self.page_size);
        LittleEndian::write_u64(&mut buf[15..23], self.page_count);
        LittleEndian::write_u64(&mut buf[23..31], self.schema_root);
        LittleEndian::write_u64(&mut buf[31..39], self.free_list_head);
        LittleEndian::write_u16(&mut buf[39..41], self.next_table_id);

        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(StorageError::InvalidHeader {
                reason: "Header too short".to_string(),
            });
        }

        if &bytes[0..8] != MAGIC {
            return Err(StorageError::InvalidHeader {
                reason: "Not a packdb file (bad magic)".to_string(),
            });
        }

        let page_size = LittleEndian::read_u32(&bytes[11..15]);
        if page_size != PAGE_SIZE as u32 {
            return Err(StorageError::InvalidHeader {
                reason: format!("Unsupported page size: {}", page_size),
            });
        }

        Ok(Self {
            version: Version::new(bytes[8], bytes[9], bytes[10]),
            page_size,
            page_count: LittleEndian::read_u64(&bytes[15..23]),
            schema_root: LittleEndian::read_u64(&bytes[23..31]),
            free_list_head: LittleEndian::read_u64(&bytes[31..39]),
            next_table_id: LittleEndian::read_u16(&bytes[39..41]),
        })
    }
}
