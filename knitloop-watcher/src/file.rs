//! File-backed watcher with background reloads.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌───────────────────┐
//! │   notify    │────▶│  watcher thread  │────▶│ RwLock<Cache<T>>  │
//! │ (dir events)│     │ (filter, reload) │     │ (last, last_good) │
//! └─────────────┘     └──────────────────┘     └───────────────────┘
//!                              ▲                          │
//!                     stop ────┘                   get() ─┘
//! ```

use std::ffi::OsString;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use parking_lot::{Mutex, RwLock};

use crate::error::{BoxError, LoadError, WatchError};
use crate::watcher::Watcher;

struct Cache<T> {
    /// Outcome of the most recent load.
    last: Result<T, LoadError>,
    /// Value of the most recent successful load.
    last_good: Option<T>,
    /// Completed reloads since construction.
    epoch: u64,
}

impl<T: Clone> Cache<T> {
    fn new(initial: Result<T, LoadError>) -> Self {
        let last_good = initial.as_ref().ok().cloned();
        Self {
            last: initial,
            last_good,
            epoch: 0,
        }
    }

    fn record(&mut self, outcome: Result<T, LoadError>) {
        if let Ok(value) = &outcome {
            self.last_good = Some(value.clone());
        }
        self.last = outcome;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

/// Consistent view of a [`FileWatcher`]'s cache.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    /// Value of the most recent successful load, if any load ever succeeded.
    pub value: Option<T>,
    /// Error of the most recent load, if it failed.
    pub error: Option<LoadError>,
    /// Number of reloads completed since construction.
    pub epoch: u64,
}

/// [`Watcher`] over a typed value loaded from a file.
///
/// Construction loads the file synchronously, then a single background thread
/// reloads it whenever the file changes. `get` only reads the cache; it never
/// touches the file system.
///
/// The subscription is placed on the parent directory and filtered to the
/// file name, so saves that replace the file by rename are picked up too.
///
/// A failed reload keeps the last good value (see [`FileWatcher::snapshot`])
/// while `get` reports the error. Dropping the watcher closes it.
pub struct FileWatcher<T> {
    path: PathBuf,
    cache: Arc<RwLock<Cache<T>>>,
    stop_tx: Sender<()>,
    closed: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T> FileWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Load `path` with `loader` and keep it fresh until closed.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError`] if the parent directory does not exist, the
    /// notification backend cannot be initialized, the directory cannot be
    /// subscribed, or the background thread cannot be spawned. Load failures
    /// are not construction errors; they are served through `get`.
    pub fn new<F, E>(path: impl Into<PathBuf>, loader: F) -> Result<Self, WatchError>
    where
        F: Fn(&Path) -> Result<T, E> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let path = path.into();
        let (watch_dir, file_name) = split_watch_target(&path)?;

        let (event_tx, event_rx) = unbounded::<notify::Result<Event>>();
        let mut notifier = notify::recommended_watcher(move |event| {
            let _ = event_tx.send(event);
        })
        .map_err(WatchError::Init)?;
        notifier
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Subscribe {
                path: path.clone(),
                source,
            })?;

        // Subscribed before the first load so no write can slip in between.
        let cache = Arc::new(RwLock::new(Cache::new(load(&path, &loader))));

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let worker = Worker {
            path: path.clone(),
            file_name,
            loader,
            cache: cache.clone(),
            events: event_rx,
            stop: stop_rx,
            _notifier: notifier,
            _error: PhantomData,
        };
        let handle = thread::Builder::new()
            .name("knitloop-watcher".to_string())
            .spawn(move || worker.run())
            .map_err(WatchError::Spawn)?;

        tracing::debug!(path = %path.display(), "watching file");

        Ok(Self {
            path,
            cache,
            stop_tx,
            closed: AtomicBool::new(false),
            worker: Mutex::new(Some(handle)),
        })
    }

    /// The watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of reloads completed since construction.
    pub fn epoch(&self) -> u64 {
        self.cache.read().epoch
    }

    /// Last good value, last error and epoch, read under one lock.
    pub fn snapshot(&self) -> Snapshot<T> {
        let cache = self.cache.read();
        Snapshot {
            value: cache.last_good.clone(),
            error: cache.last.as_ref().err().cloned(),
            epoch: cache.epoch,
        }
    }

    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.worker.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        tracing::debug!(path = %self.path.display(), "stopped watching file");
    }
}

impl<T> Watcher<T> for FileWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> Result<T, LoadError> {
        self.cache.read().last.clone()
    }

    fn close(&self) {
        self.shutdown();
    }
}

impl<T> Drop for FileWatcher<T> {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.worker.get_mut().take() {
            let _ = handle.join();
        }
    }
}

impl<T> std::fmt::Debug for FileWatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("path", &self.path)
            .field("epoch", &self.cache.read().epoch)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

struct Worker<T, F, E> {
    path: PathBuf,
    file_name: OsString,
    loader: F,
    cache: Arc<RwLock<Cache<T>>>,
    events: Receiver<notify::Result<Event>>,
    stop: Receiver<()>,
    // Dropping the notifier releases the OS subscription.
    _notifier: RecommendedWatcher,
    _error: PhantomData<fn() -> E>,
}

impl<T, F, E> Worker<T, F, E>
where
    T: Clone,
    F: Fn(&Path) -> Result<T, E>,
    E: Into<BoxError>,
{
    fn run(self) {
        loop {
            select! {
                recv(self.stop) -> _ => break,
                recv(self.events) -> event => {
                    let Ok(event) = event else { break };
                    match event {
                        Ok(event) if self.is_relevant(&event) => {
                            // One reload covers everything already queued.
                            for _ in self.events.try_iter() {}
                            self.reload();
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::warn!(
                                path = %self.path.display(),
                                error = %err,
                                "file watcher event error",
                            );
                        }
                    }
                }
            }
        }
    }

    fn is_relevant(&self, event: &Event) -> bool {
        let kind_matches = matches!(
            event.kind,
            EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        );
        kind_matches
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(self.file_name.as_os_str()))
    }

    fn reload(&self) {
        let outcome = load(&self.path, &self.loader);
        match &outcome {
            Ok(_) => tracing::debug!(path = %self.path.display(), "reloaded watched file"),
            Err(err) => tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "reload failed; keeping last good value",
            ),
        }
        self.cache.write().record(outcome);
    }
}

fn load<T, F, E>(path: &Path, loader: &F) -> Result<T, LoadError>
where
    F: Fn(&Path) -> Result<T, E>,
    E: Into<BoxError>,
{
    loader(path).map_err(|err| LoadError::new(path.display().to_string(), err))
}

fn split_watch_target(path: &Path) -> Result<(PathBuf, OsString), WatchError> {
    let missing = || WatchError::MissingParent {
        path: path.to_path_buf(),
    };
    let file_name = path.file_name().ok_or_else(missing)?.to_os_string();
    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(missing()),
    };
    if !parent.is_dir() {
        return Err(missing());
    }
    Ok((parent.to_path_buf(), file_name))
}
