//! Directory creation that tolerates concurrent creators.

use std::path::Path;

use nextgen_common::{Error, Result};

use crate::config::PipelineConfig;

/// Creates `path` (and missing parents) unless it already exists.
///
/// Another process or thread may create the same directory between the
/// existence check and the create call. That failure is ignored as long as
/// `path` ends up being a directory.
///
/// # Errors
///
/// - `NotADirectory` when `path`, or one of its ancestors, exists as
///   something other than a directory
/// - `Io` with the original error for every other failure, such as a
///   denied permission
pub fn safe_makedir<P: AsRef<Path> + ?Sized>(path: &P) -> Result<&Path> {
    let path = path.as_ref();
    if !path.exists() {
        if let Err(e) = std::fs::create_dir_all(path) {
            if path.is_dir() {
                return Ok(path);
            }
            return Err(match occupied_ancestor(path) {
                Some(occupied) => Error::not_a_directory(occupied, e),
                None => Error::io_at(path, e),
            });
        }
        log::debug!("created directory {}", path.display());
    } else if !path.is_dir() {
        return Err(Error::not_a_directory(
            path,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            ),
        ));
    }
    Ok(path)
}

/// The nearest ancestor of `path` (or `path` itself) that exists but is not
/// a directory.
fn occupied_ancestor(path: &Path) -> Option<&Path> {
    path.ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists() && !p.is_dir())
}

/// Ensures the configured directories exist: the ones named in `names`, or
/// every entry of `config.dir` when `names` is `None`.
pub fn create_dirs(config: &PipelineConfig, names: Option<&[&str]>) -> Result<()> {
    match names {
        Some(names) => {
            for name in names {
                safe_makedir(config.dir(name)?)?;
            }
        }
        None => {
            for dir in config.dir.values() {
                safe_makedir(dir)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{sync::Barrier, thread};

    use nextgen_common::ErrorKind;

    use super::*;

    #[test]
    fn test_safe_makedir_twice() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("a").join("b");

        assert_eq!(safe_makedir(&target).unwrap(), target.as_path());
        safe_makedir(&target).unwrap();
        assert!(target.is_dir());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_safe_makedir_concurrent() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("shared").join("nested");
        let barrier = Barrier::new(8);

        thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        safe_makedir(&target).map(|_| ())
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });
        assert!(target.is_dir());
    }

    #[test]
    fn test_safe_makedir_over_file_fails() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("occupied");
        std::fs::write(&target, b"data").unwrap();

        let err = safe_makedir(&target).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotADirectory { .. }));
        assert!(target.is_file());

        // A file in the parent chain fails too.
        let err = safe_makedir(&target.join("child")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotADirectory { .. }));
    }

    #[test]
    fn test_safe_makedir_keeps_io_failure() {
        let err = safe_makedir("bad\0name").unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Io { source, .. } if source.kind() == std::io::ErrorKind::InvalidInput
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_safe_makedir_permission_denied_is_io() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let locked = root.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        let child = locked.join("child");
        let res = safe_makedir(&child).map(|_| ());
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        // Privileged users can write anywhere; only check the error shape.
        if let Err(err) = res {
            assert!(matches!(
                err.kind(),
                ErrorKind::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied
            ));
        }
    }

    #[test]
    fn test_create_dirs() {
        let root = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        for name in ["work", "align", "tx"] {
            config
                .dir
                .insert(name.to_string(), root.path().join(name).join("out"));
        }

        create_dirs(&config, Some(&["work"][..])).unwrap();
        assert!(root.path().join("work/out").is_dir());
        assert!(!root.path().join("align").exists());

        create_dirs(&config, None).unwrap();
        for dir in config.dir.values() {
            assert!(dir.is_dir());
        }

        let err = create_dirs(&config, Some(&["missing"][..])).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_create_dirs_empty_config() {
        create_dirs(&PipelineConfig::default(), None).unwrap();
    }
}
