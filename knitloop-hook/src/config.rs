//! Hook configuration file.
//!
//! ```yaml
//! lifecycle:
//!   before:
//!     - http://hooks.internal/before
//!   after:
//!     - http://hooks.internal/after
//!     - https://audit.internal/runs
//! ```
//!
//! Both lists are optional. An empty file is an empty configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading a hook configuration file.
#[derive(Debug, Error)]
pub enum HookConfigError {
    #[error("failed to read hook config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse hook config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid webhook URL '{url}' in {path}: expected http:// or https://")]
    InvalidUrl { path: PathBuf, url: String },
}

/// Root of the hook configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

/// Webhook URLs called around each unit, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    #[serde(default)]
    pub before: Vec<String>,
    #[serde(default)]
    pub after: Vec<String>,
}

impl Lifecycle {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

impl HookConfig {
    /// Read and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, HookConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| HookConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse `text`; `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, HookConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: HookConfig =
            serde_yaml::from_str(text).map_err(|source| HookConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        config.validate(origin)?;
        Ok(config)
    }

    fn validate(&self, origin: &Path) -> Result<(), HookConfigError> {
        let lifecycle = &self.lifecycle;
        match lifecycle
            .before
            .iter()
            .chain(&lifecycle.after)
            .find(|url| !is_http_url(url))
        {
            Some(url) => Err(HookConfigError::InvalidUrl {
                path: origin.to_path_buf(),
                url: url.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty())
}
