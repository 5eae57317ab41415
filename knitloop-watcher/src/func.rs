use crate::error::{BoxError, LoadError};
use crate::watcher::Watcher;

const ORIGIN: &str = "loader";

/// Pull-based [`Watcher`]: every `get` calls the loader again.
///
/// No caching and no background work, so `close` has nothing to release.
/// Useful for sources with no change notification, and in tests.
pub struct FuncWatcher<F> {
    loader: F,
}

impl<F> FuncWatcher<F> {
    pub fn new(loader: F) -> Self {
        Self { loader }
    }
}

impl<T, E, F> Watcher<T> for FuncWatcher<F>
where
    F: Fn() -> Result<T, E> + Send + Sync,
    E: Into<BoxError>,
{
    fn get(&self) -> Result<T, LoadError> {
        (self.loader)().map_err(|err| LoadError::new(ORIGIN, err))
    }

    fn close(&self) {}
}

impl<F> std::fmt::Debug for FuncWatcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuncWatcher").finish_non_exhaustive()
    }
}
