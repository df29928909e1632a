//! Cancellation flag observed by interruptible waits.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A shared, cloneable interrupt flag.
///
/// All clones observe the same flag. A typical owner hands a clone to a
/// signal handler (or to another thread) and calls [`trigger`](Self::trigger)
/// from there; any [`TaskHandle::wait`](crate::join_handle::TaskHandle::wait)
/// polling with this flag then returns an interrupted error on its next poll.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Creates a flag that is not triggered.
    pub fn new() -> Interrupt {
        Interrupt::default()
    }

    /// Sets the flag. It stays set until [`reset`](Self::reset).
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`trigger`](Self::trigger) has been called on any
    /// clone and not reset since.
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag so that subsequent waits block normally again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
