use std::sync::Arc;

use crate::error::LoadError;

/// Access to the current state of a live resource.
pub trait Watcher<T>: Send + Sync {
    /// Returns the current value, or the error from the most recent load.
    ///
    /// Must be safe to call concurrently with background refreshes and with
    /// [`Watcher::close`].
    fn get(&self) -> Result<T, LoadError>;

    /// Stops background refreshes and releases OS resources.
    ///
    /// Idempotent. After closing, `get` keeps serving the last cached value.
    fn close(&self);
}

impl<T, W> Watcher<T> for Box<W>
where
    W: Watcher<T> + ?Sized,
{
    fn get(&self) -> Result<T, LoadError> {
        (**self).get()
    }

    fn close(&self) {
        (**self).close()
    }
}

impl<T, W> Watcher<T> for Arc<W>
where
    W: Watcher<T> + ?Sized,
{
    fn get(&self) -> Result<T, LoadError> {
        (**self).get()
    }

    fn close(&self) {
        (**self).close()
    }
}
