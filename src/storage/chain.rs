//! Operations over singly linked chains of packed pages.
//!
//! The schema catalog and every table's records live in such chains. Entries
//! are found by decoding each page front to back; new entries go to the first
//! page with room, and the chain grows by one linked page when none has room.

use crate::codec::DecodeResult;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PackedPage, PageId, MAX_ENTRY_SIZE, PACKED_HEADER_SIZE};
use crate::storage::pager::Pager;
use log::debug;
use std::ops::ControlFlow;

pub type Decoder<T> = fn(&[u8]) -> DecodeResult<T>;

/// A decoded entry and the bytes it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    pub page_id: PageId,
    pub offset: usize,
    pub len: usize,
    pub value: T,
}

/// Bounds a walk to the number of pages in the file so a damaged link that
/// points back into the chain cannot loop forever.
struct Walk {
    next: Option<PageId>,
    remaining: u64,
}

impl Walk {
    fn new(pager: &Pager, root: Option<PageId>) -> Self {
        Self {
            next: root,
            remaining: pager.header().page_count,
        }
    }

    fn step(&mut self) -> StorageResult<Option<PageId>> {
        let Some(page_id) = self.next else {
            return Ok(None);
        };
        if self.remaining == 0 {
            return Err(StorageError::CorruptedEntry {
                page_id,
                reason: "page chain does not terminate".to_string(),
            });
        }
        self.remaining -= 1;
        Ok(Some(page_id))
    }
}

pub fn check_entry_size(len: usize) -> StorageResult<()> {
    if len > MAX_ENTRY_SIZE {
        return Err(StorageError::EntryTooLarge {
            size: len,
            max: MAX_ENTRY_SIZE,
        });
    }
    Ok(())
}

/// Decode the entries of one page in order, returning them with the page's
/// successor.
pub fn read_page<T>(
    pager: &mut Pager,
    page_id: PageId,
    decode: Decoder<T>,
) -> StorageResult<(Vec<Located<T>>, Option<PageId>)> {
    pager.with_page(page_id, |data| {
        let page = PackedPage::from_data(&data[..]);
        let mut entries = Vec::with_capacity(page.entry_count() as usize);
        let mut offset = PACKED_HEADER_SIZE;

        for _ in 0..page.entry_count() {
            let bytes = page.entry_bytes(offset);
            if bytes.is_empty() {
                break;
            }
            let (value, len) = decode(bytes).map_err(|e| e.at_page(page_id))?;
            if len == 0 {
                break;
            }
            entries.push(Located {
                page_id,
                offset,
                len,
                value,
            });
            offset += len;
        }

        Ok((entries, page.next_page()))
    })
}

/// Hand each page's entries to `visit` in chain order until it breaks.
pub fn walk<T, R>(
    pager: &mut Pager,
    root: Option<PageId>,
    decode: Decoder<T>,
    mut visit: impl FnMut(Vec<Located<T>>) -> ControlFlow<R>,
) -> StorageResult<Option<R>> {
    let mut walk = Walk::new(pager, root);
    while let Some(page_id) = walk.step()? {
        let (entries, next) = read_page(pager, page_id, decode)?;
        if let ControlFlow::Break(found) = visit(entries) {
            return Ok(Some(found));
        }
        walk.next = next;
    }
    Ok(None)
}

/// First entry in chain order matching `pred`.
pub fn find<T>(
    pager: &mut Pager,
    root: Option<PageId>,
    decode: Decoder<T>,
    pred: impl Fn(&T) -> bool,
) -> StorageResult<Option<Located<T>>> {
    walk(pager, root, decode, |entries| {
        match entries.into_iter().find(|e| pred(&e.value)) {
            Some(entry) => ControlFlow::Break(entry),
            None => ControlFlow::Continue(()),
        }
    })
}

/// Total of the per-page entry counts along the chain.
pub fn count_entries(pager: &mut Pager, root: Option<PageId>) -> StorageResult<usize> {
    let mut walk = Walk::new(pager, root);
    let mut total = 0;
    while let Some(page_id) = walk.step()? {
        let (count, next) = pager.with_page(page_id, |data| {
            let page = PackedPage::from_data(&data[..]);
            Ok((page.entry_count() as usize, page.next_page()))
        })?;
        total += count;
        walk.next = next;
    }
    Ok(total)
}

/// Every entry of the chain. Counts first so the result is allocated once.
pub fn collect<T>(
    pager: &mut Pager,
    root: Option<PageId>,
    decode: Decoder<T>,
) -> StorageResult<Vec<T>> {
    let mut values = Vec::with_capacity(count_entries(pager, root)?);
    walk(pager, root, decode, |entries| {
        values.extend(entries.into_iter().map(|e| e.value));
        ControlFlow::<()>::Continue(())
    })?;
    Ok(values)
}

/// Append `entry` to the first page of the chain with room for it, linking a
/// new tail page when none has. Returns the page and offset it landed at.
pub fn append_first_fit(
    pager: &mut Pager,
    root: PageId,
    entry: &[u8],
) -> StorageResult<(PageId, usize)> {
    check_entry_size(entry.len())?;

    let mut walk = Walk::new(pager, Some(root));
    while let Some(page_id) = walk.step()? {
        let (fits, next) = pager.with_page(page_id, |data| {
            let page = PackedPage::from_data(&data[..]);
            Ok((page.has_room_for(entry.len()), page.next_page()))
        })?;

        if fits {
            let offset = append_to(pager, page_id, entry)?;
            return Ok((page_id, offset));
        }

        match next {
            Some(next) => walk.next = Some(next),
            None => {
                let tail = pager.allocate_page()?;
                pager.with_page_mut(page_id, |data| {
                    PackedPage::from_data(&mut data[..]).set_next_page(Some(tail));
                    Ok(())
                })?;
                debug!("Linked page {} after page {}", tail, page_id);

                let offset = append_to(pager, tail, entry)?;
                return Ok((tail, offset));
            }
        }
    }

    // Only reachable through a chain that loops without a tail.
    Err(StorageError::CorruptedEntry {
        page_id: root,
        reason: "page chain has no tail".to_string(),
    })
}

fn append_to(pager: &mut Pager, page_id: PageId, entry: &[u8]) -> StorageResult<usize> {
    pager.with_page_mut(page_id, |data| PackedPage::from_data(&mut data[..]).append(entry))
}

/// Remove a located entry, compacting the rest of its page.
pub fn remove<T>(pager: &mut Pager, located: &Located<T>) -> StorageResult<()> {
    pager.with_page_mut(located.page_id, |data| {
        PackedPage::from_data(&mut data[..]).remove(located.offset, located.len);
        Ok(())
    })
}

/// Overwrite a located entry with bytes that are no longer than it.
pub fn overwrite<T>(pager: &mut Pager, located: &Located<T>, entry: &[u8]) -> StorageResult<()> {
    if entry.len() > located.len {
        return Err(StorageError::PageFull {
            required: entry.len(),
            available: located.len,
        });
    }
    pager.with_page_mut(located.page_id, |data| {
        PackedPage::from_data(&mut data[..]).shrink_entry(located.offset, located.len, entry);
        Ok(())
    })
}
