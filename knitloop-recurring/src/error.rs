use knitloop_hook::{HookError, Phase};
use thiserror::Error;

use crate::reconciler::ReconcileError;
use crate::shutdown::ShutdownCause;

/// Why a loop stopped unsuccessfully.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("{phase} hook failed: {source}")]
    Hook {
        phase: Phase,
        #[source]
        source: HookError,
    },

    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Cancelled because something upstream failed.
    #[error("loop cancelled by {0}")]
    Cancelled(ShutdownCause),

    #[error("hook task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}
