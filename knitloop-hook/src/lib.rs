//! Lifecycle hooks run around each reconciled unit.
//!
//! - [`Hook`]: the before/after contract, with [`NoHook`] and [`FuncHook`].
//! - [`HookWatcher`]: resolves the current hook from a [`Watcher`] on every
//!   call, so hook behaviour follows its configuration file live.
//! - [`config`]: the YAML hook configuration file.
//! - [`webhook`]: hooks that POST the unit as JSON to configured URLs.
//!
//! [`Watcher`]: knitloop_watcher::Watcher

pub mod config;
mod error;
mod hook;
mod watch;
pub mod webhook;

pub use config::{HookConfig, HookConfigError, Lifecycle};
pub use error::{HookError, Phase};
pub use hook::{FuncHook, Hook, NoHook, SharedHook};
pub use watch::{watch, HookWatcher};
pub use webhook::{build, Webhook};
