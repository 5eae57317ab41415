//! Spool-backed reconciler used by `knitloop run`.

use async_trait::async_trait;
use chrono::Utc;

use knitloop_core::{LoopType, Spool, SpoolError, WorkItem};
use knitloop_recurring::{ReconcileError, Reconciler};

/// Takes pending items of one loop type from the spool, oldest first, and
/// records each as reconciled by moving it to `done/`.
#[derive(Debug, Clone)]
pub struct SpoolReconciler {
    spool: Spool,
    loop_type: LoopType,
}

impl SpoolReconciler {
    pub fn new(spool: Spool, loop_type: LoopType) -> Self {
        Self { spool, loop_type }
    }
}

#[async_trait]
impl Reconciler<WorkItem> for SpoolReconciler {
    async fn pending(&mut self) -> Result<Option<WorkItem>, ReconcileError> {
        let spool = self.spool.clone();
        let loop_type = self.loop_type;
        blocking(move || spool.next_pending(loop_type), "failed to read pending work").await
    }

    async fn reconcile(&mut self, mut unit: WorkItem) -> Result<WorkItem, ReconcileError> {
        unit.reconciled_at = Some(Utc::now());
        let spool = self.spool.clone();
        let item = unit.clone();
        let done = blocking(move || spool.complete(&item), "failed to complete work item").await?;
        tracing::info!(
            loop_type = %unit.loop_type,
            id = %unit.id,
            done = %done.display(),
            "reconciled work item",
        );
        Ok(unit)
    }
}

/// Spool access is plain file I/O; keep it off the async workers.
async fn blocking<T, F>(op: F, context: &'static str) -> Result<T, ReconcileError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SpoolError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|err| ReconcileError::with_source(context, err))?
        .map_err(|err| ReconcileError::with_source(context, err))
}
