pub mod lru;
pub mod replacer;

use crate::storage::disk::PageStore;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PAGE_SIZE};
use log::debug;
use lru::LruReplacer;
use replacer::{FrameId, Replacer};
use std::collections::HashMap;

pub const DEFAULT_CACHE_CAPACITY: usize = 10;

struct Frame {
    data: Box<[u8; PAGE_SIZE]>,
    page_id: Option<PageId>,
    is_dirty: bool,
}

impl Frame {
    fn new() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
            page_id: None,
            is_dirty: false,
        }
    }
}

/// Bounded write-back cache of pages in front of a [`PageStore`].
///
/// At most `capacity` pages are resident. A miss with every frame in use
/// evicts the least recently used page, writing it back first if dirty.
pub struct PageCache {
    store: PageStore,
    frames: Vec<Frame>,
    free_frames: Vec<FrameId>,
    page_table: HashMap<PageId, FrameId>,
    replacer: Box<dyn Replacer>,
    capacity: usize,
}

impl PageCache {
    pub fn new(store: PageStore, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            store,
            frames: Vec::with_capacity(capacity),
            free_frames: Vec::new(),
            page_table: HashMap::with_capacity(capacity),
            replacer: Box::new(LruReplacer::new(capacity)),
            capacity,
        }
    }

    /// Return the buffer for `page_id`, reading it from the store on a miss.
    /// A page beyond the end of the file comes back zero-filled.
    pub fn fetch(&mut self, page_id: PageId) -> StorageResult<&mut [u8; PAGE_SIZE]> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            self.replacer.record_access(frame_id);
            return Ok(&mut *self.frames[frame_id].data);
        }

        let frame_id = self.get_frame()?;
        let frame = &mut self.frames[frame_id];
        if let Err(e) = self.store.read_page(page_id, &mut frame.data) {
            self.free_frames.push(frame_id);
            return Err(e);
        }
        frame.page_id = Some(page_id);
        frame.is_dirty = false;

        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);

        Ok(&mut *self.frames[frame_id].data)
    }

    /// Flag a resident page as modified. The page must have been fetched.
    pub fn mark_dirty(&mut self, page_id: PageId) -> StorageResult<()> {
        let frame_id = *self
            .page_table
            .get(&page_id)
            .ok_or(StorageError::PageNotResident(page_id))?;
        self.frames[frame_id].is_dirty = true;
        Ok(())
    }

    /// Write a page back if it is resident and dirty.
    pub fn flush(&mut self, page_id: PageId) -> StorageResult<()> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            let frame = &mut self.frames[frame_id];
            if frame.is_dirty {
                self.store.write_page(page_id, &frame.data)?;
                frame.is_dirty = false;
            }
        }
        Ok(())
    }

    /// Write back every dirty page and sync the file.
    pub fn flush_all(&mut self) -> StorageResult<()> {
        let mut flushed = 0;
        for frame in self.frames.iter_mut() {
            if let Some(page_id) = frame.page_id {
                if frame.is_dirty {
                    self.store.write_page(page_id, &frame.data)?;
                    frame.is_dirty = false;
                    flushed += 1;
                }
            }
        }
        self.store.sync()?;

        debug!("Flushed {} dirty pages", flushed);
        Ok(())
    }

    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.page_table.contains_key(&page_id)
    }

    pub fn is_dirty(&self, page_id: PageId) -> bool {
        self.page_table
            .get(&page_id)
            .is_some_and(|&frame_id| self.frames[frame_id].is_dirty)
    }

    pub fn resident_count(&self) -> usize {
        self.page_table.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Direct access to the underlying store, bypassing the cache.
    pub fn store_mut(&mut self) -> &mut PageStore {
        &mut self.store
    }

    fn get_frame(&mut self) -> StorageResult<FrameId> {
        if let Some(frame_id) = self.free_frames.pop() {
            return Ok(frame_id);
        }

        if self.frames.len() < self.capacity {
            self.frames.push(Frame::new());
            return Ok(self.frames.len() - 1);
        }

        let victim = self.replacer.evict().ok_or(StorageError::CacheExhausted)?;
        let frame = &mut self.frames[victim];

        if let Some(old_page_id) = frame.page_id {
            if frame.is_dirty {
                if let Err(e) = self.store.write_page(old_page_id, &frame.data) {
                    // Keep the page resident so its changes are not lost
                    self.replacer.record_access(victim);
                    return Err(e);
                }
                frame.is_dirty = false;
            }
            self.page_table.remove(&old_page_id);
            debug!("Evicted page {} from frame {}", old_page_id, victim);
        }
        frame.page_id = None;

        Ok(victim)
    }
}
