//! Packed page layout shared by catalog and record pages.
//!
//! ```text
//! +--------------+-------------------+-----------+---------------------------+
//! | entry_count  | free_space_offset | next_page | entry | entry | ... | free |
//! | u16          | u16               | u32       |                           |
//! +--------------+-------------------+-----------+---------------------------+
//! ```
//!
//! Entries are appended back to back at `free_space_offset`. There is no slot
//! directory: an entry is located by decoding every entry before it, and
//! removing one shifts all following bytes left.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PAGE_SIZE};
use byteorder::{ByteOrder, LittleEndian};

pub const PACKED_HEADER_SIZE: usize = 8;
const ENTRY_COUNT_OFFSET: usize = 0;
const FREE_SPACE_OFFSET_OFFSET: usize = 2;
const NEXT_PAGE_OFFSET: usize = 4;

/// Bytes that must stay free per entry on top of its encoded length.
pub const ENTRY_RESERVE: usize = 2;

/// Largest encoded entry an empty page can take.
pub const MAX_ENTRY_SIZE: usize = PAGE_SIZE - PACKED_HEADER_SIZE - ENTRY_RESERVE;

/// View over a page buffer. Read accessors work on any byte container, the
/// mutating ones need a mutable buffer.
pub struct PackedPage<T> {
    data: T,
}

impl<T: AsRef<[u8]>> PackedPage<T> {
    pub fn from_data(data: T) -> Self {
        Self { data }
    }

    fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub fn entry_count(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes()[ENTRY_COUNT_OFFSET..])
    }

    /// Offset where the next entry will be appended. Out-of-range values from a
    /// damaged page are clamped so readers never index past the buffer.
    pub fn free_space_offset(&self) -> usize {
        let raw = LittleEndian::read_u16(&self.bytes()[FREE_SPACE_OFFSET_OFFSET..]) as usize;
        raw.clamp(PACKED_HEADER_SIZE, PAGE_SIZE)
    }

    pub fn next_page(&self) -> Option<PageId> {
        PageId::from_link(LittleEndian::read_u32(&self.bytes()[NEXT_PAGE_OFFSET..]))
    }

    pub fn free_space(&self) -> usize {
        PAGE_SIZE - self.free_space_offset()
    }

    pub fn has_room_for(&self, entry_len: usize) -> bool {
        entry_len + ENTRY_RESERVE <= self.free_space()
    }

    /// Packed bytes from `offset` up to the end of the used region.
    pub fn entry_bytes(&self, offset: usize) -> &[u8] {
        let end = self.free_space_offset();
        &self.bytes()[offset.min(end)..end]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> PackedPage<T> {
    /// Format `data` as an empty page with no successor.
    pub fn new(mut data: T) -> Self {
        let bytes = data.as_mut();
        bytes.fill(0);
        LittleEndian::write_u16(
            &mut bytes[FREE_SPACE_OFFSET_OFFSET..],
            PACKED_HEADER_SIZE as u16,
        );
        Self { data }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    fn set_entry_count(&mut self, count: u16) {
        LittleEndian::write_u16(&mut self.bytes_mut()[ENTRY_COUNT_OFFSET..], count);
    }

    fn set_free_space_offset(&mut self, offset: usize) {
        LittleEndian::write_u16(
            &mut self.bytes_mut()[FREE_SPACE_OFFSET_OFFSET..],
            offset as u16,
        );
    }

    pub fn set_next_page(&mut self, next: Option<PageId>) {
        LittleEndian::write_u32(
            &mut self.bytes_mut()[NEXT_PAGE_OFFSET..],
            PageId::to_link(next),
        );
    }

    /// Append an entry at the free space offset and return where it starts.
    pub fn append(&mut self, entry: &[u8]) -> StorageResult<usize> {
        if !self.has_room_for(entry.len()) {
            return Err(StorageError::PageFull {
                required: entry.len() + ENTRY_RESERVE,
                available: self.free_space(),
            });
        }

        let offset = self.free_space_offset();
        self.bytes_mut()[offset..offset + entry.len()].copy_from_slice(entry);
        self.set_free_space_offset(offset + entry.len());
        let count = self.entry_count();
        self.set_entry_count(count.saturating_add(1));

        Ok(offset)
    }

    /// Remove the `len` bytes at `offset`, closing the gap.
    pub fn remove(&mut self, offset: usize, len: usize) {
        self.close_gap(offset, len);
        let count = self.entry_count();
        self.set_entry_count(count.saturating_sub(1));
    }

    /// Overwrite an entry with one that is not longer, closing any leftover gap
    /// so the following entries stay contiguous.
    pub fn shrink_entry(&mut self, offset: usize, old_len: usize, entry: &[u8]) {
        debug_assert!(entry.len() <= old_len);
        self.bytes_mut()[offset..offset + entry.len()].copy_from_slice(entry);
        self.close_gap(offset + entry.len(), old_len - entry.len());
    }

    fn close_gap(&mut self, offset: usize, len: usize) {
        let end = self.free_space_offset();
        let start = offset.min(end);
        let len = len.min(end - start);
        if len == 0 {
            return;
        }

        let bytes = self.bytes_mut();
        bytes.copy_within(start + len..end, start);
        bytes[end - len..end].fill(0);
        self.set_free_space_offset(end - len);
    }
}
