//! Handles for waiting on results of tasks submitted to a [`WorkerPool`].
//!
//! [`WorkerPool`]: crate::thread_pool::WorkerPool

use std::{sync::mpsc::RecvTimeoutError, time::Duration};

use nextgen_common::{Error, Result};

use crate::{
    interrupt::Interrupt,
    oneshot::{self, OneshotReceiver},
};

/// A handle for the result of a task running on a worker pool.
///
/// ## Lifecycle
///
/// 1. **Pending**: the task is queued or running
/// 2. **Ready**: the task finished, or was dropped by pool teardown
/// 3. **Consumed**: the result was taken by [`join()`](Self::join) or
///    [`wait()`](Self::wait)
pub struct TaskHandle<R>(OneshotReceiver<R>);

impl<R> TaskHandle<R> {
    pub(crate) fn new(rx: OneshotReceiver<R>) -> TaskHandle<R> {
        TaskHandle(rx)
    }

    /// Creates a handle that is immediately ready with `res`.
    pub fn ready(res: R) -> Self {
        Self(oneshot::ready(res))
    }

    /// Returns `true` once the result is available or the task was abandoned.
    pub fn is_ready(&self) -> bool {
        !self.0.is_pending()
    }

    /// Blocks until the task completes.
    ///
    /// Returns `None` if the pool dropped the task without running it to
    /// completion. This wait cannot be interrupted; see [`wait()`](Self::wait).
    pub fn join(self) -> Option<R> {
        self.0.recv()
    }

    /// Waits for the result in bounded slices of `poll_interval`, checking
    /// `interrupt` between slices.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Interrupted`] if `interrupt` is triggered before the
    ///   result arrives,
    /// - [`ErrorKind::WorkerLost`] if the task was dropped by pool teardown.
    ///
    /// [`ErrorKind::Interrupted`]: nextgen_common::ErrorKind::Interrupted
    /// [`ErrorKind::WorkerLost`]: nextgen_common::ErrorKind::WorkerLost
    pub fn wait(&self, interrupt: &Interrupt, poll_interval: Duration) -> Result<R> {
        loop {
            if interrupt.is_triggered() {
                return Err(Error::interrupted());
            }
            match self.0.recv_timeout(poll_interval) {
                Ok(Some(res)) => return Ok(res),
                Ok(None) => return Err(Error::worker_lost()),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(Error::worker_lost()),
            }
        }
    }

    /// Waits for every handle, in order. Abandoned tasks yield `None`.
    pub fn join_all(handles: impl IntoIterator<Item = TaskHandle<R>>) -> Vec<Option<R>> {
        handles.into_iter().map(|h| h.join()).collect()
    }
}
