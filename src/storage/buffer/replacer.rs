use std::fmt::Debug;

/// Index of a frame in the page cache.
pub type FrameId = usize;

pub trait Replacer: Send + Debug {
    /// Record a use of the frame, making it the most recently used.
    fn record_access(&mut self, frame_id: FrameId);

    /// Select a frame to evict and stop tracking it. Returns None if no frame
    /// is tracked.
    fn evict(&mut self) -> Option<FrameId>;
}
