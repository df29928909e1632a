//! Replacing consumed intermediate files with a short placeholder.

use std::path::Path;

use nextgen_common::{Error, Result};

use crate::config::PipelineConfig;

/// Overwrites `path` with a one-line note when `algorithm.save_diskspace` is
/// enabled. The file itself is kept as evidence that the step ran.
pub fn save_diskspace(path: impl AsRef<Path>, reason: &str, config: &PipelineConfig) -> Result<()> {
    if !config.algorithm.save_diskspace {
        return Ok(());
    }
    let path = path.as_ref();
    log::debug!("saving disk space: truncating {} ({reason})", path.display());
    std::fs::write(path, placeholder(reason)).map_err(|e| Error::io_at(path, e))
}

fn placeholder(reason: &str) -> String {
    format!("File removed to save disk space: {reason}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(save_diskspace: bool) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.algorithm.save_diskspace = save_diskspace;
        config
    }

    #[test]
    fn test_disabled_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("reads.fastq");
        std::fs::write(&file, "@r1\nACGT\n+\nIIII\n").unwrap();

        save_diskspace(&file, "aligned", &config(false)).unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "@r1\nACGT\n+\nIIII\n");
    }

    #[test]
    fn test_enabled_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("reads.fastq");
        std::fs::write(&file, "@r1\nACGT\n+\nIIII\n").unwrap();

        save_diskspace(&file, "Merged into sample.bam", &config(true)).unwrap();
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "File removed to save disk space: Merged into sample.bam"
        );
    }

    #[test]
    fn test_write_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_diskspace(dir.path(), "dir", &config(true)).unwrap_err();
        assert!(matches!(err.kind(), nextgen_common::ErrorKind::Io { .. }));
    }
}
