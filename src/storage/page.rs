pub mod packed_page;

use std::fmt;

/// Size of every page in the file, header page included.
pub const PAGE_SIZE: usize = 4096;

/// Page number within the database file. Page 0 holds the file header, so a
/// link value of 0 on disk always means "no page".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    pub const HEADER: PageId = PageId(0);

    /// Byte offset of this page in the file.
    pub fn offset(self) -> u64 {
        self.0 as u64 * PAGE_SIZE as u64
    }

    /// Decode an on-disk link where 0 terminates the chain.
    pub fn from_link(raw: u32) -> Option<PageId> {
        if raw == 0 {
            None
        } else {
            Some(PageId(raw))
        }
    }

    /// Encode an optional link, using 0 for the end of a chain.
    pub fn to_link(page_id: Option<PageId>) -> u32 {
        page_id.map_or(0, |p| p.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub use packed_page::{PackedPage, ENTRY_RESERVE, MAX_ENTRY_SIZE, PACKED_HEADER_SIZE};
