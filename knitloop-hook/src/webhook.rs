//! Webhook hooks built from a [`Lifecycle`] configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::Lifecycle;
use crate::error::{HookError, Phase};
use crate::hook::{Hook, NoHook, SharedHook};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hook that POSTs the unit as JSON to each configured URL in order.
///
/// A phase stops at the first URL that fails to answer or answers with a
/// non-2xx status; later URLs of that phase are not called.
pub struct Webhook {
    before: Vec<String>,
    after: Vec<String>,
    agent: ureq::Agent,
}

impl Webhook {
    pub fn new(lifecycle: &Lifecycle) -> Self {
        Self::with_timeout(lifecycle, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(lifecycle: &Lifecycle, timeout: Duration) -> Self {
        Self {
            before: lifecycle.before.clone(),
            after: lifecycle.after.clone(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn post_all<T: Serialize>(
        &self,
        phase: Phase,
        urls: &[String],
        value: &T,
    ) -> Result<(), HookError> {
        for url in urls {
            let failed = |reason: String| HookError::Webhook {
                phase,
                url: url.clone(),
                reason,
            };
            match self.agent.post(url).send_json(value) {
                Ok(response) => {
                    tracing::debug!(
                        %phase,
                        url = %url,
                        status = response.status(),
                        "webhook delivered"
                    );
                }
                Err(ureq::Error::Status(code, _)) => {
                    return Err(failed(format!("status {code}")));
                }
                Err(err) => return Err(failed(err.to_string())),
            }
        }
        Ok(())
    }
}

impl<T: Serialize> Hook<T> for Webhook {
    fn before(&self, value: &T) -> Result<(), HookError> {
        self.post_all(Phase::Before, &self.before, value)
    }

    fn after(&self, value: &T) -> Result<(), HookError> {
        self.post_all(Phase::After, &self.after, value)
    }
}

impl std::fmt::Debug for Webhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webhook")
            .field("before", &self.before)
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}

/// Compile a lifecycle configuration into one hook.
///
/// An empty configuration yields [`NoHook`].
pub fn build<T: Serialize + 'static>(lifecycle: &Lifecycle) -> SharedHook<T> {
    if lifecycle.is_empty() {
        Arc::new(NoHook)
    } else {
        Arc::new(Webhook::new(lifecycle))
    }
}
