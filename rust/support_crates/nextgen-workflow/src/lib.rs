//! Parallel execution utilities for pipeline steps.
//!
//! # Key Components
//!
//! - [`parallel_map`] - picks sequential or pooled execution for a `map` over
//!   inputs, based on a requested [`Concurrency`](parallel_map::Concurrency)
//! - [`thread_pool::WorkerPool`] - fixed-size worker pool with non-graceful
//!   teardown
//! - [`join_handle::TaskHandle`] - result handle with an interruptible wait
//! - [`interrupt::Interrupt`] - shared cancellation flag checked by those waits
//! - [`oneshot`] - single-value channel carrying results back from workers

pub mod interrupt;
pub mod join_handle;
pub mod oneshot;
pub mod parallel_map;
pub mod thread_pool;

pub use parallel_map::{
    Concurrency, MapIter, MapperOptions, ParallelMap, acquire_mapper,
    acquire_mapper_with_options, with_mapper,
};
