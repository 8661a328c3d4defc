use super::replacer::{FrameId, Replacer};

const NIL: FrameId = FrameId::MAX;

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: FrameId,
    next: FrameId,
    linked: bool,
}

impl Link {
    const UNLINKED: Link = Link {
        prev: NIL,
        next: NIL,
        linked: false,
    };
}

/// Recency list threaded through a per-frame link table, so every operation is
/// O(1). The head is the most recently used frame, the tail the eviction victim.
#[derive(Debug)]
pub struct LruReplacer {
    links: Vec<Link>,
    head: FrameId,
    tail: FrameId,
    len: usize,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            links: vec![Link::UNLINKED; capacity],
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    fn is_linked(&self, frame_id: FrameId) -> bool {
        self.links.get(frame_id).is_some_and(|l| l.linked)
    }

    fn unlink(&mut self, frame_id: FrameId) {
        let Link { prev, next, .. } = self.links[frame_id];

        if prev == NIL {
            self.head = next;
        } else {
            self.links[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.links[next].prev = prev;
        }

        self.links[frame_id] = Link::UNLINKED;
        self.len -= 1;
    }

    fn push_front(&mut self, frame_id: FrameId) {
        if frame_id >= self.links.len() {
            self.links.resize(frame_id + 1, Link::UNLINKED);
        }

        self.links[frame_id] = Link {
            prev: NIL,
            next: self.head,
            linked: true,
        };
        if self.head == NIL {
            self.tail = frame_id;
        } else {
            self.links[self.head].prev = frame_id;
        }
        self.head = frame_id;
        self.len += 1;
    }
}

impl Replacer for LruReplacer {
    fn record_access(&mut self, frame_id: FrameId) {
        if self.head == frame_id {
            return;
        }
        if self.is_linked(frame_id) {
            self.unlink(frame_id);
        }
        self.push_front(frame_id);
    }

    fn evict(&mut self) -> Option<FrameId> {
        if self.tail == NIL {
            return None;
        }
        let victim = self.tail;
        self.unlink(victim);
        Some(victim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_lru_operations() {
        let mut replacer = LruReplacer::new(3);

        assert_eq!(replacer.len, 0);
        assert_eq!(replacer.evict(), None);

        replacer.record_access(0);
        replacer.record_access(1);
        replacer.record_access(2);
        assert_eq!(replacer.len, 3);

        // Oldest access is evicted first
        assert_eq!(replacer.evict(), Some(0));
        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), Some(2));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_access_promotes_frame() {
        let mut replacer = LruReplacer::new(3);

        replacer.record_access(0);
        replacer.record_access(1);
        replacer.record_access(2);

        // Touch the oldest frame again
        replacer.record_access(0);

        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), Some(2));
        assert_eq!(replacer.evict(), Some(0));
    }

    #[test]
    fn test_duplicate_access() {
        let mut replacer = LruReplacer::new(2);

        replacer.record_access(1);
        replacer.record_access(1);
        assert_eq!(replacer.len, 1);
        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.len, 0);
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let mut replacer = LruReplacer::new(1);

        replacer.record_access(0);
        replacer.record_access(4);
        assert_eq!(replacer.len, 2);
        assert_eq!(replacer.evict(), Some(0));
        assert_eq!(replacer.evict(), Some(4));
    }

    #[test]
    fn test_complex_scenario() {
        let mut replacer = LruReplacer::new(4);

        replacer.record_access(0);
        replacer.record_access(1);
        replacer.record_access(2);
        replacer.record_access(1);

        assert_eq!(replacer.evict(), Some(0));

        replacer.record_access(3);
        replacer.record_access(2);

        // Order from oldest: 1, 3, 2
        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), Some(3));
        assert_eq!(replacer.evict(), Some(2));
        assert_eq!(replacer.evict(), None);
    }
}
