//! Skip pipeline steps whose output file is already in place.

use std::{
    fs,
    path::{Path, PathBuf},
};

/// Derives the output path for `in_file` by replacing its extension with
/// `ext`. `ext` is appended verbatim, so it carries its own separator:
/// `("a.txt", ".out")` gives `a.out`, `("a.bam", "-sorted.bam")` gives
/// `a-sorted.bam`.
pub fn outfile_for(in_file: &Path, ext: &str) -> PathBuf {
    let mut out = match in_file.extension() {
        Some(_) => in_file.with_extension(""),
        None => in_file.to_path_buf(),
    }
    .into_os_string();
    out.push(ext);
    PathBuf::from(out)
}

/// Wraps a step `f(in_file, out_file)` so that it only runs when its output
/// is missing.
///
/// The returned function computes `out_file` with [`outfile_for`], calls `f`
/// unless `out_file` exists with a non-zero size, and returns `out_file`.
/// Errors from `f` are returned unchanged.
///
/// ```no_run
/// # use std::path::Path;
/// let sort_bam = nextgen_utils::memoize_outfile("-sorted.bam", |in_bam: &Path, out_bam: &Path| {
///     std::fs::copy(in_bam, out_bam).map(|_| ())
/// });
/// let sorted = sort_bam(Path::new("sample.bam"))?;
/// assert_eq!(sorted, Path::new("sample-sorted.bam"));
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn memoize_outfile<F, T, E>(
    ext: impl Into<String>,
    f: F,
) -> impl Fn(&Path) -> Result<PathBuf, E>
where
    F: Fn(&Path, &Path) -> Result<T, E>,
{
    let ext = ext.into();
    move |in_file: &Path| -> Result<PathBuf, E> {
        let out_file = outfile_for(in_file, &ext);
        if has_content(&out_file) {
            log::debug!("{} exists, skipping", out_file.display());
        } else {
            log::debug!("producing {} from {}", out_file.display(), in_file.display());
            f(in_file, &out_file)?;
        }
        Ok(out_file)
    }
}

fn has_content(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.len() > 0)
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        path::{Path, PathBuf},
    };

    use super::*;

    #[test]
    fn test_outfile_for() {
        assert_eq!(outfile_for(Path::new("a.txt"), ".out"), PathBuf::from("a.out"));
        assert_eq!(
            outfile_for(Path::new("/data/s1.bam"), "-sorted.bam"),
            PathBuf::from("/data/s1-sorted.bam")
        );
        assert_eq!(outfile_for(Path::new("x.tar.gz"), ".txt"), PathBuf::from("x.tar.txt"));
        assert_eq!(outfile_for(Path::new("reads"), ".fq"), PathBuf::from("reads.fq"));
        assert_eq!(
            outfile_for(Path::new("run.d/reads"), ".fq"),
            PathBuf::from("run.d/reads.fq")
        );
    }

    #[test]
    fn test_runs_then_skips() {
        let dir = tempfile::tempdir().unwrap();
        let in_file = dir.path().join("a.txt");
        std::fs::write(&in_file, "input").unwrap();

        let calls = Cell::new(0);
        let step = memoize_outfile(".out", |input: &Path, output: &Path| {
            calls.set(calls.get() + 1);
            let data = std::fs::read_to_string(input)?;
            std::fs::write(output, data.to_uppercase())
        });

        let out = step(&in_file).unwrap();
        assert_eq!(out, dir.path().join("a.out"));
        assert_eq!(calls.get(), 1);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "INPUT");

        let again = step(&in_file).unwrap();
        assert_eq!(again, out);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_empty_output_reruns() {
        let dir = tempfile::tempdir().unwrap();
        let in_file = dir.path().join("a.txt");
        let out_file = dir.path().join("a.out");
        std::fs::write(&out_file, "").unwrap();

        let calls = Cell::new(0);
        let step = memoize_outfile(".out", |_: &Path, output: &Path| {
            calls.set(calls.get() + 1);
            std::fs::write(output, "done")
        });

        assert_eq!(step(&in_file).unwrap(), out_file);
        assert_eq!(calls.get(), 1);
        assert_eq!(std::fs::read_to_string(&out_file).unwrap(), "done");
    }

    #[test]
    fn test_errors_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let step = memoize_outfile(".out", |_: &Path, _: &Path| -> Result<(), String> {
            Err("tool failed".to_string())
        });
        assert_eq!(step(&dir.path().join("a.txt")).unwrap_err(), "tool failed");
        assert!(!dir.path().join("a.out").exists());
    }
}
