//! Configurable parallel `map`.
//!
//! [`acquire_mapper`] picks an execution strategy from the requested
//! [`Concurrency`] and returns a [`ParallelMap`] scope:
//!
//! - `Cluster` (or `use_cluster`): not implemented, fails right away
//! - `Cores(1)`: lazy in-thread mapping, no workers
//! - `Cores(k)`, `k > 1`: a [`WorkerPool`] of `k` threads
//!
//! In every mode [`ParallelMap::map`] returns a lazy iterator whose results
//! come back in input order. The pool lives exactly as long as the
//! `ParallelMap`; dropping it terminates the pool and discards queued work.

use std::{
    collections::VecDeque,
    fmt,
    panic::{self, AssertUnwindSafe},
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use nextgen_common::{Error, Result, verify_arg};

use crate::{interrupt::Interrupt, join_handle::TaskHandle, thread_pool::WorkerPool};

/// Requested degree of parallelism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// Number of local workers; 1 means sequential.
    Cores(usize),
    /// Distributed execution, reserved.
    Cluster,
}

impl Concurrency {
    /// One core: map on the calling thread.
    pub const SEQUENTIAL: Concurrency = Concurrency::Cores(1);
}

impl From<usize> for Concurrency {
    fn from(cores: usize) -> Self {
        Concurrency::Cores(cores)
    }
}

impl FromStr for Concurrency {
    type Err = Error;

    /// Accepts a positive core count, or `cluster` / `ipython` (any case).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("cluster") || s.eq_ignore_ascii_case("ipython") {
            return Ok(Concurrency::Cluster);
        }
        let cores = s.parse::<usize>().map_err(|e| {
            Error::invalid_arg(
                "concurrency",
                format!("expected a core count or \"cluster\", got {s:?}: {e}"),
            )
        })?;
        verify_arg!(cores, cores > 0);
        Ok(Concurrency::Cores(cores))
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concurrency::Cores(n) => write!(f, "{n}"),
            Concurrency::Cluster => f.write_str("cluster"),
        }
    }
}

/// Tuning knobs for [`acquire_mapper_with_options`].
#[derive(Debug, Clone)]
pub struct MapperOptions {
    /// Upper bound on a single blocking slice while waiting for a result.
    /// The interrupt flag is checked between slices.
    pub poll_interval: Duration,
    /// Worker thread `i` is named `{worker_name_prefix}-{i}`.
    pub worker_name_prefix: String,
}

impl Default for MapperOptions {
    fn default() -> Self {
        MapperOptions {
            poll_interval: Duration::from_millis(100),
            worker_name_prefix: "nextgen-worker".to_string(),
        }
    }
}

/// Acquires a mapper for `concurrency` with default [`MapperOptions`].
///
/// # Errors
///
/// - `NotImplemented` when `use_cluster` is set or `concurrency` is
///   [`Concurrency::Cluster`]
/// - `InvalidArgument` for `Cores(0)`
/// - `Unavailable` when the worker threads cannot be started
pub fn acquire_mapper(concurrency: Concurrency, use_cluster: bool) -> Result<ParallelMap> {
    acquire_mapper_with_options(concurrency, use_cluster, MapperOptions::default())
}

/// Acquires a mapper for `concurrency`.
///
/// # Arguments
///
/// * `concurrency` - Requested parallelism; `Cores(1)` maps sequentially.
/// * `use_cluster` - Request distributed execution regardless of
///   `concurrency`.
/// * `options` - Poll interval and worker thread naming.
///
/// # Errors
///
/// Same as [`acquire_mapper`].
pub fn acquire_mapper_with_options(
    concurrency: Concurrency,
    use_cluster: bool,
    options: MapperOptions,
) -> Result<ParallelMap> {
    let cores = match concurrency {
        _ if use_cluster => return Err(Error::not_implemented("cluster execution")),
        Concurrency::Cluster => return Err(Error::not_implemented("cluster execution")),
        Concurrency::Cores(cores) => cores,
    };
    verify_arg!(concurrency, cores > 0);

    let pool = if cores == 1 {
        log::debug!("parallel map: sequential");
        None
    } else {
        let pool = start_workers(cores, &options.worker_name_prefix)?;
        log::debug!("parallel map: {cores} workers");
        Some(pool)
    };

    Ok(ParallelMap {
        pool,
        interrupt: Interrupt::new(),
        poll_interval: options.poll_interval,
    })
}

fn start_workers(cores: usize, name_prefix: &str) -> Result<WorkerPool> {
    WorkerPool::with_thread_name(cores, |i| format!("{name_prefix}-{i}"))
        .map_err(|e| Error::unavailable("worker pool", e))
}

/// Runs `body` with a freshly acquired mapper and tears the mapper down
/// afterwards, including when `body` panics.
pub fn with_mapper<T>(
    concurrency: Concurrency,
    use_cluster: bool,
    body: impl FnOnce(&ParallelMap) -> T,
) -> Result<T> {
    let mapper = acquire_mapper(concurrency, use_cluster)?;
    Ok(body(&mapper))
}

/// A mapper scope returned by [`acquire_mapper`].
pub struct ParallelMap {
    pool: Option<WorkerPool>,
    interrupt: Interrupt,
    poll_interval: Duration,
}

impl ParallelMap {
    /// Returns `true` when items are mapped on the calling thread.
    pub fn is_sequential(&self) -> bool {
        self.pool.is_none()
    }

    /// Number of workers; 1 in sequential mode.
    pub fn concurrency(&self) -> usize {
        self.pool.as_ref().map_or(1, WorkerPool::num_workers)
    }

    /// The flag checked by every wait of iterators produced by this mapper.
    /// Triggering it makes the current (or next) `next()` call return an
    /// interrupted error, after which the iterator is exhausted and its
    /// queued items are skipped by the workers.
    ///
    /// The flag stays set: every later `map()` on this mapper reports
    /// `Interrupted` on its first `next()` until [`Interrupt::reset`] is
    /// called.
    pub fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Applies `f` to each item lazily, yielding results in input order.
    ///
    /// In sequential mode `f(item)` runs inside `next()`. With workers, up to
    /// twice the worker count of items are in flight ahead of the consumer. A
    /// panic in `f` on a worker resumes in the thread calling `next()`.
    pub fn map<I, F, R>(&self, f: F, items: I) -> MapIter<'_, I::IntoIter, F, R>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        MapIter {
            items: items.into_iter(),
            func: Arc::new(f),
            pool: self.pool.as_ref(),
            window: self.concurrency() * 2,
            pending: VecDeque::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
            interrupt: &self.interrupt,
            poll_interval: self.poll_interval,
            done: false,
        }
    }
}

impl Drop for ParallelMap {
    fn drop(&mut self) {
        if let Some(pool) = &self.pool {
            log::debug!("parallel map: tearing down {} workers", pool.num_workers());
            pool.terminate();
        }
    }
}

/// Lazy, order-preserving result sequence returned by [`ParallelMap::map`].
pub struct MapIter<'a, I, F, R> {
    items: I,
    func: Arc<F>,
    pool: Option<&'a WorkerPool>,
    window: usize,
    pending: VecDeque<TaskHandle<Option<thread::Result<R>>>>,
    /// Set once the iterator stops; queued tasks then return without
    /// calling `func`.
    cancelled: Arc<AtomicBool>,
    interrupt: &'a Interrupt,
    poll_interval: Duration,
    done: bool,
}

impl<I, F, R> MapIter<'_, I, F, R>
where
    I: Iterator,
    I::Item: Send + 'static,
    F: Fn(I::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    fn fill_window(&mut self, pool: &WorkerPool) {
        while self.pending.len() < self.window {
            let Some(item) = self.items.next() else {
                break;
            };
            let func = self.func.clone();
            let cancelled = self.cancelled.clone();
            self.pending.push_back(pool.spawn(move || {
                if cancelled.load(Ordering::Acquire) {
                    return None;
                }
                Some(panic::catch_unwind(AssertUnwindSafe(|| func(item))))
            }));
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.cancelled.store(true, Ordering::Release);
        self.pending.clear();
    }
}

impl<I, F, R> Drop for MapIter<'_, I, F, R> {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl<I, F, R> Iterator for MapIter<'_, I, F, R>
where
    I: Iterator,
    I::Item: Send + 'static,
    F: Fn(I::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    type Item = Result<R>;

    fn next(&mut self) -> Option<Result<R>> {
        if self.done {
            return None;
        }

        let Some(pool) = self.pool else {
            let item = self.items.next()?;
            if self.interrupt.is_triggered() {
                self.finish();
                return Some(Err(Error::interrupted()));
            }
            return Some(Ok((self.func)(item)));
        };

        self.fill_window(pool);
        let Some(handle) = self.pending.pop_front() else {
            self.done = true;
            return None;
        };
        match handle.wait(self.interrupt, self.poll_interval) {
            Ok(Some(Ok(res))) => Some(Ok(res)),
            Ok(Some(Err(payload))) => {
                self.finish();
                panic::resume_unwind(payload)
            }
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let (lower, upper) = self.items.size_hint();
        let pending = self.pending.len();
        (
            lower.saturating_add(pending),
            upper.and_then(|u| u.checked_add(pending)),
        )
    }
}
