//! Scoped filesystem resources.
//!
//! Each helper returns a guard that releases the resource when dropped, so
//! cleanup happens on early returns, `?` and panics alike. The `with_*`
//! variants run a closure inside the scope and report cleanup errors that a
//! `Drop` impl would have to swallow.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use nextgen_common::{Error, Result};
use tempfile::{NamedTempFile, TempDir};

use crate::dirs::safe_makedir;

/// A temporary directory under `<cwd>/tmp`, removed recursively on drop.
#[derive(Debug)]
pub struct CurdirTmpDir(TempDir);

impl CurdirTmpDir {
    /// Absolute path of the directory.
    pub fn path(&self) -> &Path {
        self.0.path()
    }

    /// Removes the directory now, reporting any failure.
    pub fn close(self) -> Result<()> {
        let path = self.0.path().to_path_buf();
        self.0.close().map_err(|e| Error::io_at(path, e))
    }
}

/// Creates a fresh directory inside `tmp` under the current working
/// directory, creating `tmp` itself when needed.
pub fn curdir_tmpdir() -> Result<CurdirTmpDir> {
    let cwd = std::env::current_dir().map_err(|e| Error::io("current directory", e))?;
    let base = cwd.join("tmp");
    safe_makedir(&base)?;
    let dir = tempfile::Builder::new()
        .prefix("tmp")
        .tempdir_in(&base)
        .map_err(|e| Error::io_at(&base, e))?;
    log::debug!("created scratch directory {}", dir.path().display());
    Ok(CurdirTmpDir(dir))
}

/// Runs `f` with the path of a [`curdir_tmpdir`] and removes the directory
/// afterwards.
pub fn with_curdir_tmpdir<T>(f: impl FnOnce(&Path) -> T) -> Result<T> {
    let dir = curdir_tmpdir()?;
    let res = f(dir.path());
    dir.close()?;
    Ok(res)
}

/// Options for [`tmpfile`], mirroring the usual `mkstemp` knobs.
#[derive(Debug, Clone, Default)]
pub struct TmpFileOptions {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// Parent directory; the system temp directory when unset.
    pub dir: Option<PathBuf>,
}

impl TmpFileOptions {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }
}

/// A temporary file; dropping it closes the descriptor and deletes the file
/// if it is still there.
#[derive(Debug)]
pub struct ScopedTempFile(NamedTempFile);

impl ScopedTempFile {
    /// Path of the file while it exists.
    pub fn path(&self) -> &Path {
        self.0.path()
    }

    pub fn as_file(&self) -> &File {
        self.0.as_file()
    }

    pub fn as_file_mut(&mut self) -> &mut File {
        self.0.as_file_mut()
    }

    /// Closes and deletes the file now. A file already removed by the caller
    /// is not an error.
    pub fn close(self) -> Result<()> {
        let path = self.0.path().to_path_buf();
        match self.0.close() {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(Error::io_at(path, e)),
            _ => Ok(()),
        }
    }
}

/// Creates an empty temporary file according to `options`.
///
/// # Errors
///
/// `Io` when the file cannot be created, for example because
/// `options.dir` does not exist.
pub fn tmpfile(options: &TmpFileOptions) -> Result<ScopedTempFile> {
    let mut builder = tempfile::Builder::new();
    if let Some(prefix) = &options.prefix {
        builder.prefix(prefix);
    }
    if let Some(suffix) = &options.suffix {
        builder.suffix(suffix);
    }
    let file = match &options.dir {
        Some(dir) => builder.tempfile_in(dir).map_err(|e| Error::io_at(dir, e))?,
        None => builder
            .tempfile()
            .map_err(|e| Error::io("temporary file", e))?,
    };
    Ok(ScopedTempFile(file))
}

/// Runs `f` with the path of a [`tmpfile`] and deletes the file afterwards.
pub fn with_tmpfile<T>(options: &TmpFileOptions, f: impl FnOnce(&Path) -> T) -> Result<T> {
    let file = tmpfile(options)?;
    let res = f(file.path());
    file.close()?;
    Ok(res)
}

/// Restores the previous working directory when dropped.
///
/// The working directory is process-wide: other threads observe the change
/// for the guard's lifetime.
#[derive(Debug)]
#[must_use = "the previous directory is restored as soon as the guard is dropped"]
pub struct ChdirGuard {
    previous: PathBuf,
}

impl ChdirGuard {
    /// The directory that will be restored.
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for ChdirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            log::warn!(
                "failed to restore working directory {}: {e}",
                self.previous.display()
            );
        }
    }
}

/// Switches the working directory to `new_dir`, creating it if needed.
pub fn chdir(new_dir: impl AsRef<Path>) -> Result<ChdirGuard> {
    let new_dir = new_dir.as_ref();
    let previous = std::env::current_dir().map_err(|e| Error::io("current directory", e))?;
    safe_makedir(new_dir)?;
    std::env::set_current_dir(new_dir).map_err(|e| Error::io_at(new_dir, e))?;
    Ok(ChdirGuard { previous })
}

/// Runs `f` with `new_dir` as the working directory.
pub fn with_chdir<T>(new_dir: impl AsRef<Path>, f: impl FnOnce() -> T) -> Result<T> {
    let _guard = chdir(new_dir)?;
    Ok(f())
}
