//! Single-value channel used to hand a task result back from a worker thread.
//!
//! The sender is consumed by [`OneshotSender::send`]. Dropping it without sending
//! closes the channel, which is how a receiver learns that the worker abandoned
//! the task (for example when the pool is terminated with the task still queued).

use std::{
    sync::{Arc, Condvar, Mutex, mpsc::RecvTimeoutError},
    time::Duration,
};

/// Creates a connected sender/receiver pair.
pub fn channel<T>() -> (OneshotSender<T>, OneshotReceiver<T>) {
    let cell = Arc::new(OneshotCell::new(State::Pending));
    (OneshotSender(cell.clone()), OneshotReceiver(cell))
}

/// Creates a receiver that already holds `value`.
pub fn ready<T>(value: T) -> OneshotReceiver<T> {
    OneshotReceiver(Arc::new(OneshotCell::new(State::Ready(value))))
}

/// Sending half, owned by the worker running the task.
pub struct OneshotSender<T>(Arc<OneshotCell<T>>);

impl<T> OneshotSender<T> {
    /// Delivers the value. Fails with the value if the receiver side already
    /// closed the channel.
    pub fn send(self, value: T) -> Result<(), T> {
        self.0.set(value)
    }
}

impl<T> Drop for OneshotSender<T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Receiving half, owned by the task handle.
pub struct OneshotReceiver<T>(Arc<OneshotCell<T>>);

impl<T> OneshotReceiver<T> {
    /// Blocks until the value arrives. `None` means the sender went away
    /// without sending, or the value was already taken.
    pub fn recv(&self) -> Option<T> {
        self.0.wait()
    }

    /// Like [`recv`](Self::recv), but gives up with
    /// [`RecvTimeoutError::Timeout`] if nothing happened within `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>, RecvTimeoutError> {
        self.0.wait_for(timeout).ok_or(RecvTimeoutError::Timeout)
    }

    /// Non-blocking variant; `Err(())` while the value is still pending.
    #[allow(clippy::result_unit_err)]
    pub fn try_recv(&self) -> Result<Option<T>, ()> {
        let mut state = self.0.lock();
        if state.is_pending() {
            Err(())
        } else {
            Ok(state.take())
        }
    }

    /// Returns `true` while neither a value nor a close has arrived.
    pub fn is_pending(&self) -> bool {
        self.0.lock().is_pending()
    }
}

impl<T> Drop for OneshotReceiver<T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

struct OneshotCell<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
}

impl<T> OneshotCell<T> {
    fn new(state: State<T>) -> OneshotCell<T> {
        OneshotCell {
            state: Mutex::new(state),
            condvar: Condvar::new(),
        }
    }

    // Neither side panics while holding the lock, so a poisoned mutex still
    // guards a consistent state.
    fn lock(&self) -> std::sync::MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, value: T) -> Result<(), T> {
        let res = {
            let mut state = self.lock();
            if state.is_pending() {
                *state = State::Ready(value);
                Ok(())
            } else {
                Err(value)
            }
        };
        self.condvar.notify_all();
        res
    }

    /// Pending -> Consumed; a ready value is left for the receiver.
    fn close(&self) {
        {
            let mut state = self.lock();
            if state.is_pending() {
                *state = State::Consumed;
            }
        }
        self.condvar.notify_all();
    }

    fn wait(&self) -> Option<T> {
        let guard = self.lock();
        self.condvar
            .wait_while(guard, |state| state.is_pending())
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// `None` on timeout, `Some(result)` once the channel left the pending state.
    fn wait_for(&self, timeout: Duration) -> Option<Option<T>> {
        let guard = self.lock();
        let (mut guard, res) = self
            .condvar
            .wait_timeout_while(guard, timeout, |state| state.is_pending())
            .unwrap_or_else(|e| e.into_inner());
        if res.timed_out() && guard.is_pending() {
            None
        } else {
            Some(guard.take())
        }
    }
}

/// `Pending` -> `Ready(T)` on send, `Pending` -> `Consumed` on close,
/// `Ready(T)` -> `Consumed` on take.
enum State<T> {
    Pending,
    Ready(T),
    Consumed,
}

impl<T> State<T> {
    fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }

    fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, State::Consumed) {
            State::Ready(value) => Some(value),
            State::Pending | State::Consumed => None,
        }
    }
}
