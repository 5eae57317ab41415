use std::fmt;

use knitloop_watcher::LoadError;
use thiserror::Error;

/// Which side of a unit of work a hook runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Before,
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Before => write!(f, "before"),
            Phase::After => write!(f, "after"),
        }
    }
}

/// Failure of a hook action.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook declined the unit.
    #[error("{0}")]
    Rejected(String),

    /// A webhook could not be delivered or answered with a non-2xx status.
    #[error("{phase} webhook {url} failed: {reason}")]
    Webhook {
        phase: Phase,
        url: String,
        reason: String,
    },

    /// The current hook could not be resolved from its watcher.
    #[error("hook is unavailable: {0}")]
    Unavailable(#[from] LoadError),
}

impl HookError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}
