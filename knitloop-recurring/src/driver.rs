//! The loop driver.
//!
//! ```text
//!            ┌────────── Continue ──────────┐
//!            ▼                              │
//!   ┌─── Running ── pending? ── before ── reconcile ── after ──┐
//!   │        ▲                                                 │ policy.step
//!   │        └──────────── Cooldown(d) ◀───────────────────────┤
//!   │                                                          │
//!   └── shutdown ──▶ Stopped(cancelled)     Drained / Fail ◀───┘
//! ```

use std::fmt;
use std::sync::Arc;

use knitloop_core::LoopType;
use knitloop_hook::{Hook, Phase, SharedHook};

use crate::error::LoopError;
use crate::policy::{Policy, Step};
use crate::reconciler::Reconciler;
use crate::shutdown::{Shutdown, ShutdownCause};

/// Everything a loop needs to know about itself, fixed at start.
pub struct LoopManifest<T> {
    pub loop_type: LoopType,
    pub policy: Policy,
    pub hooks: SharedHook<T>,
}

impl<T> fmt::Debug for LoopManifest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopManifest")
            .field("loop_type", &self.loop_type)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Result of a single cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// One unit went through before, reconcile and after.
    Processed,
    /// The reconciler had nothing pending.
    NoWorkAvailable,
    Failed(LoopError),
}

/// A successful stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A backlog policy found no more work.
    BacklogDrained,
    /// Shutdown was requested for a non-failure cause.
    Cancelled(ShutdownCause),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::BacklogDrained => write!(f, "backlog-drained"),
            StopReason::Cancelled(cause) => write!(f, "cancelled ({cause})"),
        }
    }
}

/// Run cycles until the policy or `shutdown` stops the loop.
///
/// Cycles run one at a time. Shutdown is observed before each cycle and
/// during cooldowns, never in the middle of a cycle.
///
/// # Errors
///
/// A failed cycle under [`Policy::UntilError`] returns its error. Shutdown
/// with an upstream-failure cause returns [`LoopError::Cancelled`].
pub async fn start_loop<T, R>(
    shutdown: &Shutdown,
    manifest: LoopManifest<T>,
    reconciler: &mut R,
) -> Result<StopReason, LoopError>
where
    T: Clone + Send + Sync + 'static,
    R: Reconciler<T> + ?Sized,
{
    let LoopManifest {
        loop_type,
        policy,
        hooks,
    } = manifest;
    tracing::info!(loop_type = %loop_type, policy = %policy, "start loop");

    let mut cycle: u64 = 0;
    loop {
        if let Some(cause) = shutdown.cause() {
            return stopped_by(loop_type, cause);
        }

        cycle += 1;
        let outcome = run_cycle(&hooks, reconciler).await;
        let step = policy.step(&outcome);
        tracing::debug!(
            loop_type = %loop_type,
            cycle,
            outcome = ?outcome,
            step = ?step,
            "cycle finished"
        );

        if let CycleOutcome::Failed(err) = outcome {
            if step == Step::Fail {
                tracing::error!(
                    loop_type = %loop_type,
                    cycle,
                    error = %err,
                    "loop stopped by error"
                );
                return Err(err);
            }
            tracing::warn!(loop_type = %loop_type, cycle, error = %err, "cycle failed; continuing");
        }

        match step {
            Step::Continue | Step::Fail => {}
            // Zero cooldown retries at once; shutdown is checked at the loop head.
            Step::Cooldown(cooldown) if cooldown.is_zero() => tokio::task::yield_now().await,
            Step::Cooldown(cooldown) => {
                tokio::select! {
                    _ = tokio::time::sleep(cooldown) => {}
                    cause = shutdown.triggered() => return stopped_by(loop_type, cause),
                }
            }
            Step::Drained => {
                tracing::info!(
                    loop_type = %loop_type,
                    cycles = cycle,
                    "backlog drained; loop stopped"
                );
                return Ok(StopReason::BacklogDrained);
            }
        }
    }
}

fn stopped_by(loop_type: LoopType, cause: ShutdownCause) -> Result<StopReason, LoopError> {
    tracing::info!(loop_type = %loop_type, cause = %cause, "loop cancelled");
    if cause.is_failure() {
        Err(LoopError::Cancelled(cause))
    } else {
        Ok(StopReason::Cancelled(cause))
    }
}

async fn run_cycle<T, R>(hooks: &SharedHook<T>, reconciler: &mut R) -> CycleOutcome
where
    T: Clone + Send + Sync + 'static,
    R: Reconciler<T> + ?Sized,
{
    let unit = match reconciler.pending().await {
        Ok(Some(unit)) => unit,
        Ok(None) => return CycleOutcome::NoWorkAvailable,
        Err(err) => return CycleOutcome::Failed(err.into()),
    };

    if let Err(err) = run_hook(hooks, Phase::Before, unit.clone()).await {
        return CycleOutcome::Failed(err);
    }

    let reconciled = reconciler.reconcile(unit.clone()).await;
    let after_unit = match &reconciled {
        Ok(updated) => updated.clone(),
        Err(_) => unit,
    };
    let after = run_hook(hooks, Phase::After, after_unit).await;

    match (reconciled, after) {
        (Ok(_), Ok(())) => CycleOutcome::Processed,
        (Ok(_), Err(err)) => CycleOutcome::Failed(err),
        (Err(err), after) => {
            if let Err(after_err) = after {
                tracing::warn!(error = %after_err, "after hook also failed");
            }
            CycleOutcome::Failed(err.into())
        }
    }
}

/// Hooks may block (webhooks), so they run on the blocking pool.
async fn run_hook<T>(hooks: &SharedHook<T>, phase: Phase, unit: T) -> Result<(), LoopError>
where
    T: Send + Sync + 'static,
{
    let hooks = Arc::clone(hooks);
    let result = tokio::task::spawn_blocking(move || match phase {
        Phase::Before => hooks.before(&unit),
        Phase::After => hooks.after(&unit),
    })
    .await?;
    result.map_err(|source| LoopError::Hook { phase, source })
}
