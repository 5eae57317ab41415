//! Cadence policies and the loop driver.
//!
//! A loop repeatedly asks its [`Reconciler`] for one pending unit, wraps the
//! reconciliation in the manifest's hooks, and lets the [`Policy`] decide
//! whether to continue, cool down, or stop. [`Shutdown`] cancels a running
//! loop from the outside.

pub mod driver;
pub mod error;
pub mod policy;
pub mod reconciler;
pub mod shutdown;

pub use driver::{start_loop, CycleOutcome, LoopManifest, StopReason};
pub use error::LoopError;
pub use policy::{ParsePolicyError, Policy, Step};
pub use reconciler::{ReconcileError, Reconciler};
pub use shutdown::{Shutdown, ShutdownCause};
