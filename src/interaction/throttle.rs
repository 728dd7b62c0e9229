//! Per-frame coalescing.
//!
//! Pointer events can arrive many times per frame. Only the latest value
//! matters, so each submit overwrites the pending one and the frame callback
//! takes at most one.

#[derive(Debug, Clone)]
pub struct FrameThrottle<T> {
    pending: Option<T>,
    coalesced: u64,
}

impl<T> Default for FrameThrottle<T> {
    fn default() -> Self {
        Self {
            pending: None,
            coalesced: 0,
        }
    }
}

impl<T> FrameThrottle<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a value for the next frame, replacing any value not yet taken.
    pub fn submit(&mut self, value: T) {
        if self.pending.replace(value).is_some() {
            self.coalesced += 1;
        }
    }

    /// Value for this frame, if anything was submitted since the last one.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value without applying it.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// How many submits were overwritten before a frame picked them up.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}
