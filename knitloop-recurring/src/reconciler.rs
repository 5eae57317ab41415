//! The collaborator a loop drives.

use async_trait::async_trait;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Finds and reconciles units of work of one loop type.
///
/// The driver calls `pending` once per cycle; `Ok(None)` means there is no
/// work right now. A unit returned by `pending` is passed to `reconcile`
/// exactly once, between the `before` and `after` hooks.
#[async_trait]
pub trait Reconciler<T: Send>: Send {
    async fn pending(&mut self) -> Result<Option<T>, ReconcileError>;

    /// Reconcile `unit`, returning its updated form.
    async fn reconcile(&mut self, unit: T) -> Result<T, ReconcileError>;
}

/// Failure reported by a [`Reconciler`].
#[derive(Debug, Error)]
#[error("{message}{}", .source.as_ref().map(|s| format!(": {s}")).unwrap_or_default())]
pub struct ReconcileError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ReconcileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
