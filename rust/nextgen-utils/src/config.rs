//! Pipeline configuration consumed by the directory and disk-space helpers.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use nextgen_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// The subset of the pipeline configuration these utilities read.
///
/// ```json
/// {
///   "dir": { "work": "/data/work", "tmp": "/scratch/tmp" },
///   "algorithm": { "save_diskspace": true }
/// }
/// ```
///
/// Sections other than `dir` and `algorithm` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Logical directory names mapped to filesystem paths.
    pub dir: BTreeMap<String, PathBuf>,
    pub algorithm: AlgorithmConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    /// Overwrite intermediate files with a placeholder once consumed.
    pub save_diskspace: bool,
}

impl PipelineConfig {
    /// Parses a configuration from JSON text. Missing sections take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the text is not valid JSON or a known key has the
    /// wrong type.
    pub fn from_json_str(json: &str) -> Result<PipelineConfig> {
        serde_json::from_str(json).map_err(|e| Error::invalid_config("pipeline config", e))
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, `InvalidConfig` when its contents
    /// do not parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<PipelineConfig> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::invalid_config(path.display().to_string(), e))
    }

    /// Looks up a configured directory by its logical name.
    pub fn dir(&self, name: &str) -> Result<&Path> {
        self.dir
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::invalid_arg("dir", format!("no directory configured for '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use nextgen_common::ErrorKind;

    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "dir": {"work": "/data/work", "align": "/data/align"},
                "algorithm": {"save_diskspace": true, "aligner": "bwa"},
                "resources": {}
            }"#,
        )
        .unwrap();
        assert_eq!(config.dir("work").unwrap(), Path::new("/data/work"));
        assert_eq!(config.dir.len(), 2);
        assert!(config.algorithm.save_diskspace);
    }

    #[test]
    fn test_missing_sections_default() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert!(config.dir.is_empty());
        assert!(!config.algorithm.save_diskspace);

        let config = PipelineConfig::from_json_str(r#"{"algorithm": {}}"#).unwrap();
        assert!(!config.algorithm.save_diskspace);
    }

    #[test]
    fn test_unknown_dir() {
        let err = PipelineConfig::default().dir("work").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let err = PipelineConfig::from_json_str(r#"{"algorithm": {"save_diskspace": "yes"}}"#)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidConfig { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dir": {{"tmp": "/scratch"}}}}"#).unwrap();
        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.dir("tmp").unwrap(), Path::new("/scratch"));

        let err = PipelineConfig::from_json_file(file.path().with_extension("missing"))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io { .. }));
    }
}
