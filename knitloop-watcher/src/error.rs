use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error accepted from loaders.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure of the most recent load of a watched resource.
///
/// Cloning is cheap: every clone shares the loader's original error, so a
/// cached failure can be handed to any number of readers.
#[derive(Debug, Clone, Error)]
#[error("failed to load {origin}: {source}")]
pub struct LoadError {
    origin: String,
    #[source]
    source: Arc<dyn StdError + Send + Sync + 'static>,
}

impl LoadError {
    pub fn new(origin: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            origin: origin.into(),
            source: Arc::from(source.into()),
        }
    }

    /// What was being loaded (a file path, or `loader` for function watchers).
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The loader's own error.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// `true` when both errors originate from the same loader failure.
    pub fn same_failure(&self, other: &LoadError) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.source), Arc::as_ptr(&other.source))
    }
}

/// Errors raised while constructing a watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to initialize file watcher: {0}")]
    Init(#[source] notify::Error),

    #[error("cannot watch {path}: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("cannot watch {path}: parent directory does not exist")]
    MissingParent { path: PathBuf },

    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[source] std::io::Error),
}
