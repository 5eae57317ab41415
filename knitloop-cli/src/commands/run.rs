//! `knitloop run --type <LOOP_TYPE> --policy <POLICY> [--config <PATH>] [--hooks <PATH>]`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use knitloop_core::{LoopType, Spool, WorkItem};
use knitloop_hook::{webhook, HookConfig, NoHook, SharedHook};
use knitloop_recurring::{start_loop, LoopManifest, Policy, Shutdown, ShutdownCause};
use knitloop_watcher::{FileWatcher, Watcher};

use super::{load_backend_config, non_empty};
use crate::reconciler::SpoolReconciler;

type HookFileWatcher = FileWatcher<SharedHook<WorkItem>>;

/// Run one loop until its policy stops it or the process is signalled.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Loop to run: projection | initialize | run_management | finishing |
    /// garbage_collection | housekeeping.
    #[arg(long = "type", value_name = "LOOP_TYPE")]
    pub loop_type: LoopType,

    /// Cadence: `backlog`, `forever` or `forever:COOLDOWN` (e.g. `forever:30s`).
    /// The loop always stops at the first failed cycle.
    #[arg(long, value_name = "POLICY")]
    pub policy: Policy,

    /// Backend configuration file.
    #[arg(long, env = "KNIT_BACKEND_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Hook configuration file, reloaded whenever it changes.
    #[arg(long, env = "KNIT_HOOK_CONFIG", value_name = "PATH")]
    pub hooks: Option<PathBuf>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        runtime.block_on(self.run_async())
    }

    async fn run_async(self) -> Result<()> {
        let config = load_backend_config(self.config.as_deref())?;
        let (hooks, hook_watcher) = match non_empty(self.hooks.as_deref()) {
            Some(path) => {
                let watcher = Arc::new(watch_hooks(&path)?);
                let hooks: SharedHook<WorkItem> = Arc::new(knitloop_hook::watch(watcher.clone()));
                (hooks, Some(watcher))
            }
            None => (Arc::new(NoHook) as SharedHook<WorkItem>, None),
        };

        let manifest = LoopManifest {
            loop_type: self.loop_type,
            policy: self.policy.until_error(),
            hooks,
        };
        let mut reconciler = SpoolReconciler::new(Spool::new(&config.spool.root), self.loop_type);

        let shutdown = Shutdown::new();
        tokio::spawn(forward_signals(shutdown.clone()));

        tracing::info!(
            namespace = %config.cluster.namespace,
            spool = %config.spool.root.display(),
            "backend configured",
        );
        let result = start_loop(&shutdown, manifest, &mut reconciler).await;

        if let Some(watcher) = hook_watcher {
            watcher.close();
        }

        match result {
            Ok(reason) => {
                tracing::info!(loop_type = %self.loop_type, reason = %reason, "loop stopped");
                Ok(())
            }
            Err(err) => {
                match shutdown.cause() {
                    Some(cause) => tracing::error!(
                        loop_type = %self.loop_type,
                        error = %err,
                        cancelled_by = %cause,
                        "loop failed",
                    ),
                    None => {
                        tracing::error!(loop_type = %self.loop_type, error = %err, "loop failed")
                    }
                }
                Err(err).with_context(|| format!("loop '{}' failed", self.loop_type))
            }
        }
    }
}

/// Watch the hook config at `path`, rebuilding the hook on every change.
fn watch_hooks(path: &Path) -> Result<HookFileWatcher> {
    let watcher = FileWatcher::new(path, |path: &Path| {
        tracing::info!(path = %path.display(), "loading hook config");
        let config = HookConfig::load(path)?;
        Ok::<_, knitloop_hook::HookConfigError>(webhook::build::<WorkItem>(&config.lifecycle))
    })
    .with_context(|| format!("cannot watch hook config '{}'", path.display()))?;

    // A broken hook file at startup is fatal; later breakage is served as hook errors.
    if let Err(err) = watcher.get() {
        watcher.close();
        return Err(err).context("cannot load hook config");
    }
    Ok(watcher)
}

async fn forward_signals(shutdown: Shutdown) {
    tokio::select! {
        received = wait_for_signal() => match received {
            Ok(name) => {
                shutdown.trigger(ShutdownCause::Signal(name.to_string()));
            }
            Err(err) => tracing::warn!(error = %err, "cannot listen for shutdown signals"),
        },
        _ = shutdown.triggered() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        received = tokio::signal::ctrl_c() => received.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "SIGINT")
}
