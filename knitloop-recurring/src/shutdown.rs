//! Process-wide cancellation with a recorded cause.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Why a [`Shutdown`] was triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownCause {
    /// An OS signal (`SIGINT`, `SIGTERM`) asked the process to stop.
    Signal(String),
    /// Something the loop depends on failed.
    Upstream(String),
}

impl ShutdownCause {
    /// Cancellation for this cause counts as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, ShutdownCause::Upstream(_))
    }
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownCause::Signal(name) => write!(f, "signal {name}"),
            ShutdownCause::Upstream(reason) => write!(f, "upstream failure: {reason}"),
        }
    }
}

/// Cloneable cancellation handle. The first cause to be triggered wins;
/// later triggers are ignored.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownCause>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Returns `false` if it was already requested.
    pub fn trigger(&self, cause: ShutdownCause) -> bool {
        let label = cause.to_string();
        let mut cause = Some(cause);
        let won = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = cause.take();
            true
        });
        if won {
            tracing::info!(cause = %label, "shutdown requested");
        }
        won
    }

    pub fn is_triggered(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn cause(&self) -> Option<ShutdownCause> {
        self.tx.borrow().clone()
    }

    /// Resolve once cancellation has been requested, returning its cause.
    pub async fn triggered(&self) -> ShutdownCause {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(cause) = rx.borrow_and_update().clone() {
                return cause;
            }
            // The sender lives in `self`, so the channel cannot close here.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown").field("cause", &self.cause()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn first_cause_wins() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());

        assert!(shutdown.trigger(ShutdownCause::Signal("SIGTERM".into())));
        assert!(!shutdown.trigger(ShutdownCause::Upstream("db down".into())));

        assert_eq!(shutdown.cause(), Some(ShutdownCause::Signal("SIGTERM".into())));
    }

    #[test]
    fn only_upstream_cause_is_a_failure() {
        assert!(!ShutdownCause::Signal("SIGINT".into()).is_failure());
        assert!(ShutdownCause::Upstream("x".into()).is_failure());
    }

    #[tokio::test]
    async fn triggered_resolves_for_clones() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.triggered().await })
        };
        tokio::task::yield_now().await;
        shutdown.trigger(ShutdownCause::Signal("SIGINT".into()));

        let cause = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("timely")
            .expect("join");
        assert_eq!(cause, ShutdownCause::Signal("SIGINT".into()));
    }

    #[tokio::test]
    async fn triggered_returns_immediately_when_already_cancelled() {
        let shutdown = Shutdown::new();
        shutdown.trigger(ShutdownCause::Upstream("gone".into()));
        assert_eq!(shutdown.triggered().await, ShutdownCause::Upstream("gone".into()));
    }
}
