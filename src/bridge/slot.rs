//! Single-value handoff cell between the event context and the UI tick.
//!
//! ```text
//!  producer: store pending ─▶ dirty.store(true, Release)
//!  consumer: dirty.swap(false, AcqRel) ─▶ clone pending
//! ```
//!
//! The flag is cleared before the copy, so a value published while the
//! tick is copying leaves the flag set for the next tick instead of being
//! lost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct FrameSlot<T> {
    dirty: AtomicBool,
    pending: Mutex<T>,
}

impl<T: Default> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> FrameSlot<T> {
    pub const fn new(initial: T) -> Self {
        Self {
            dirty: AtomicBool::new(false),
            pending: Mutex::new(initial),
        }
    }

    /// Replace the pending value.  Publishing twice before a tick keeps
    /// only the second value.
    pub fn publish(&self, value: T) {
        *self.lock() = value;
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        // A panicking observer must not wedge the link.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> FrameSlot<T> {
    /// Take the pending value if it changed since the last take.
    pub fn take(&self) -> Option<T> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        Some(self.lock().clone())
    }
}
