use std::marker::PhantomData;

use knitloop_watcher::Watcher;

use crate::error::HookError;
use crate::hook::{Hook, SharedHook};

/// [`Hook`] that looks up the current hook from a [`Watcher`] on every call.
///
/// When the watcher is file-backed, editing the hook configuration changes
/// the behaviour of subsequent calls without a restart. Two consecutive calls
/// may see different hooks if a reload landed in between.
pub struct HookWatcher<T, W> {
    watcher: W,
    _unit: PhantomData<fn(&T)>,
}

/// Wrap `watcher` as a [`Hook`].
pub fn watch<T, W>(watcher: W) -> HookWatcher<T, W>
where
    W: Watcher<SharedHook<T>>,
{
    HookWatcher::new(watcher)
}

impl<T, W> HookWatcher<T, W>
where
    W: Watcher<SharedHook<T>>,
{
    pub fn new(watcher: W) -> Self {
        Self {
            watcher,
            _unit: PhantomData,
        }
    }

    /// Closes the underlying watcher. Idempotent.
    pub fn close(&self) {
        self.watcher.close();
    }

    fn current(&self) -> Result<SharedHook<T>, HookError> {
        self.watcher.get().map_err(HookError::Unavailable)
    }
}

impl<T, W> Hook<T> for HookWatcher<T, W>
where
    W: Watcher<SharedHook<T>>,
{
    fn before(&self, value: &T) -> Result<(), HookError> {
        self.current()?.before(value)
    }

    fn after(&self, value: &T) -> Result<(), HookError> {
        self.current()?.after(value)
    }
}

impl<T, W: std::fmt::Debug> std::fmt::Debug for HookWatcher<T, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookWatcher")
            .field("watcher", &self.watcher)
            .finish()
    }
}
