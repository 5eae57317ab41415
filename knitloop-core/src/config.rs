//! Backend configuration file.
//!
//! ```yaml
//! cluster:
//!   namespace: knit-system
//! spool:
//!   root: ./spool        # relative paths resolve against this file's directory
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub cluster: ClusterConfig,
    pub spool: SpoolConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Namespace the backend operates in. Used as a log label.
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoolConfig {
    pub root: PathBuf,
}

impl BackendConfig {
    /// Read and validate the file at `path`.
    ///
    /// A relative `spool.root` is resolved against the directory containing
    /// `path`, so the config behaves the same from any working directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: BackendConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if config.cluster.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "cluster.namespace must not be empty".into(),
            });
        }
        if config.spool.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "spool.root must not be empty".into(),
            });
        }
        if config.spool.root.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.spool.root = base.join(&config.spool.root);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("backend.yaml");
        fs::write(&path, text).expect("write");
        path
    }

    #[test]
    fn relative_spool_root_resolves_against_config_dir() {
        let dir = TempDir::new().expect("tempdir");
        let path = write(&dir, "cluster:\n  namespace: knit\nspool:\n  root: spool\n");

        let config = BackendConfig::load(&path).expect("load");
        assert_eq!(config.cluster.namespace, "knit");
        assert_eq!(config.spool.root, dir.path().join("spool"));
    }

    #[test]
    fn absolute_spool_root_is_kept() {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().join("abs");
        let path = write(
            &dir,
            &format!("cluster:\n  namespace: knit\nspool:\n  root: {}\n", root.display()),
        );

        assert_eq!(BackendConfig::load(&path).expect("load").spool.root, root);
    }

    #[test]
    fn empty_namespace_is_invalid() {
        let dir = TempDir::new().expect("tempdir");
        let path = write(&dir, "cluster:\n  namespace: ''\nspool:\n  root: s\n");

        let err = BackendConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }), "got: {err}");
        assert!(err.to_string().contains("cluster.namespace"));
    }

    #[test]
    fn missing_section_is_a_parse_error_with_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = write(&dir, "cluster:\n  namespace: knit\n");

        let err = BackendConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("backend.yaml"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = BackendConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
    }
}
