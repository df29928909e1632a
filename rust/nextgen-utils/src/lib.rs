//! Helpers for building analysis pipelines.
//!
//! - [`config`] - typed pipeline configuration
//! - [`dirs`] - race-tolerant directory creation
//! - [`scoped`] - temporary directories, temporary files and working
//!   directory changes that clean up on every exit path
//! - [`memoize`] - skip steps whose output file already exists
//! - [`diskspace`] - replace intermediate files with a short note
//!
//! The configurable parallel map lives in `nextgen-workflow` and is
//! re-exported here.

pub mod config;
pub mod diskspace;
pub mod dirs;
pub mod memoize;
pub mod scoped;

pub use config::{AlgorithmConfig, PipelineConfig};
pub use diskspace::save_diskspace;
pub use dirs::{create_dirs, safe_makedir};
pub use memoize::{memoize_outfile, outfile_for};
pub use nextgen_common::{Error, ErrorKind, Result};
pub use nextgen_workflow::{
    Concurrency, MapIter, MapperOptions, ParallelMap, acquire_mapper, acquire_mapper_with_options,
    interrupt::Interrupt, with_mapper,
};
pub use scoped::{
    ChdirGuard, CurdirTmpDir, ScopedTempFile, TmpFileOptions, chdir, curdir_tmpdir, tmpfile,
    with_chdir, with_curdir_tmpdir, with_tmpfile,
};
