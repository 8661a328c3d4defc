//! Storage layer implementation for packdb.
//!
//! Everything lives in one file made of fixed-size pages:
//!
//! - **Page**: 4KB blocks addressed by page number; page 0 is the file header
//! - **PageStore**: Reads and writes whole pages at `page_id * PAGE_SIZE`
//! - **PageCache**: Bounded write-back cache of pages with LRU eviction
//! - **PackedPage**: Page format holding variable-length entries back to back,
//!   linked to the next page of its chain
//! - **Pager**: Header plus cache, the handle every chain operation goes through
//! - **chain**: First-fit placement and scans over linked packed pages

pub mod buffer;
pub mod chain;
pub mod disk;
pub mod error;
pub mod header;
pub mod page;
pub mod pager;

pub use buffer::PageCache;
pub use disk::PageStore;
pub use error::{StorageError, StorageResult};
pub use header::{Header, Version};
pub use page::{PackedPage, PageId, PAGE_SIZE};
pub use pager::Pager;
