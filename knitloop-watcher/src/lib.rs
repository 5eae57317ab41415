//! Live resource accessors.
//!
//! A [`Watcher`] hands out the current value of a resource that may change
//! while the process runs, or the error from its most recent load.
//!
//! - [`FuncWatcher`] re-runs its loader on every read.
//! - [`FileWatcher`] caches the value loaded from a file and reloads it in a
//!   background thread whenever the file changes on disk.

mod error;
mod file;
mod func;
mod watcher;

pub use error::{BoxError, LoadError, WatchError};
pub use file::{FileWatcher, Snapshot};
pub use func::FuncWatcher;
pub use watcher::Watcher;
