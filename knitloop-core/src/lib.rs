//! Core types and storage shared by the knitloop crates.
//!
//! - [`types`]: loop types and the work items loops reconcile
//! - [`config`]: the backend configuration file
//! - [`spool`]: on-disk queue of pending and reconciled work items
//! - [`error`]: [`ConfigError`], [`SpoolError`]

pub mod config;
pub mod error;
pub mod spool;
pub mod types;

pub use config::BackendConfig;
pub use error::{ConfigError, ParseLoopTypeError, SpoolError};
pub use spool::Spool;
pub use types::{LoopType, WorkItem, WorkItemId};
