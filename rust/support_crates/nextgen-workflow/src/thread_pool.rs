//! Fixed-size worker pool with non-graceful teardown.
//!
//! Tasks are pushed onto a shared queue and picked up by whichever worker is
//! idle. Terminating the pool discards everything still queued and lets the
//! workers exit once their current task (if any) returns; nothing waits for
//! the queue to drain.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Condvar, Mutex, MutexGuard},
    thread,
};

use crate::{join_handle::TaskHandle, oneshot};

/// A bounded set of worker threads owned by a single scope.
///
/// Dropping the pool terminates it, see [`terminate`](Self::terminate).
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    num_workers: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_workers", &self.num_workers)
            .finish_non_exhaustive()
    }
}

type TaskFn = Box<dyn FnOnce() + Send + 'static>;

impl WorkerPool {
    /// Starts `num_workers` unnamed worker threads.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for zero workers; otherwise whatever the OS reports
    /// when a thread cannot be spawned.
    pub fn new(num_workers: usize) -> io::Result<Self> {
        Self::with_thread_name(num_workers, |_| String::new())
    }

    /// Starts `num_workers` worker threads, naming thread `i` with
    /// `thread_name(i)`. An empty name leaves the thread unnamed.
    ///
    /// # Arguments
    ///
    /// * `num_workers` - Number of threads to start, at least one.
    /// * `thread_name` - Maps a worker index to its thread name.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new). If any spawn fails, the workers started
    /// so far are shut down before the error is returned.
    pub fn with_thread_name(
        num_workers: usize,
        thread_name: impl Fn(usize) -> String,
    ) -> io::Result<Self> {
        if num_workers == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "worker pool needs at least one worker",
            ));
        }

        let queue = Arc::new(TaskQueue::new());
        for i in 0..num_workers {
            let mut builder = thread::Builder::new();
            let name = thread_name(i);
            if !name.is_empty() {
                builder = builder.name(name);
            }
            let worker_queue = queue.clone();
            if let Err(e) = builder.spawn(move || Self::thread_fn(worker_queue)) {
                queue.terminate();
                return Err(e);
            }
        }

        log::debug!("started worker pool with {num_workers} workers");
        Ok(WorkerPool { queue, num_workers })
    }

    /// Number of worker threads started by this pool.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Queues `f` and returns a handle for its result.
    ///
    /// On a terminated pool the task is dropped immediately and the handle
    /// reports a lost worker.
    pub fn spawn<F, R>(&self, f: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx_result, rx_result) = oneshot::channel::<R>();
        self.spawn_detached(move || {
            // The receiver may be gone if the caller stopped consuming.
            let _ = tx_result.send(f());
        });
        TaskHandle::new(rx_result)
    }

    /// Queues `f` without a way to observe its completion.
    pub fn spawn_detached<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.queue.push(Box::new(f)).is_err() {
            log::debug!("task submitted to a terminated worker pool was dropped");
        }
    }

    /// Discards all queued tasks and signals the workers to exit.
    ///
    /// Tasks already running are not interrupted; their results are still
    /// delivered to any live handle. Calling this more than once is harmless.
    pub fn terminate(&self) {
        let dropped = self.queue.terminate();
        if dropped > 0 {
            log::debug!("worker pool terminated, {dropped} queued tasks discarded");
        }
    }

    /// Returns `true` after [`terminate`](Self::terminate) (or drop of the
    /// last owner) has run. New tasks are dropped from then on.
    pub fn is_terminated(&self) -> bool {
        self.queue.lock().terminated
    }

    fn thread_fn(queue: Arc<TaskQueue>) {
        while let Some(task) = queue.pop() {
            task();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.terminate();
    }
}

struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

struct QueueState {
    tasks: VecDeque<TaskFn>,
    terminated: bool,
}

impl TaskQueue {
    fn new() -> TaskQueue {
        TaskQueue {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                terminated: false,
            }),
            available: Condvar::new(),
        }
    }

    // Tasks run outside the lock, so poisoning can't leave the queue half-updated.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, task: TaskFn) -> Result<(), TaskFn> {
        let mut state = self.lock();
        if state.terminated {
            return Err(task);
        }
        state.tasks.push_back(task);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Blocks until a task is available; `None` once the queue is terminated.
    fn pop(&self) -> Option<TaskFn> {
        let guard = self.lock();
        let mut state = self
            .available
            .wait_while(guard, |s| s.tasks.is_empty() && !s.terminated)
            .unwrap_or_else(|e| e.into_inner());
        if state.terminated {
            None
        } else {
            state.tasks.pop_front()
        }
    }

    /// Marks the queue terminated and drops the pending tasks, returning how
    /// many were discarded.
    fn terminate(&self) -> usize {
        let pending = {
            let mut state = self.lock();
            state.terminated = true;
            std::mem::take(&mut state.tasks)
        };
        self.available.notify_all();
        // Dropping a task closes its result channel, outside the lock.
        let count = pending.len();
        drop(pending);
        count
    }
}
