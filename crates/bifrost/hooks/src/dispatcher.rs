//! Fire-and-forget lifecycle hook dispatch
//!
//! Each dispatch runs on its own spawned task under the dispatcher's retry
//! policy. The triggering request never waits on it, and a hook that keeps
//! failing is logged and dropped once the retry budget is spent.

use crate::hook::HookSet;
use crate::retry::RetryPolicy;
use bifrost_types::{Bundle, LifecycleEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Dispatches lifecycle events to the configured hooks.
#[derive(Debug, Clone)]
pub struct HookDispatcher {
    hooks: Arc<HookSet>,
    environment: Arc<str>,
    policy: RetryPolicy,
}

impl HookDispatcher {
    pub fn new(hooks: HookSet, environment: impl Into<String>) -> Self {
        Self {
            hooks: Arc::new(hooks),
            environment: Arc::from(environment.into()),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Schedule the hook for `event`, if one is configured.
    ///
    /// Returns the handle of the spawned task. Request paths drop it; the
    /// task's outcome is only ever logged. Must be called from within a
    /// tokio runtime.
    pub fn dispatch(&self, event: LifecycleEvent, bundle: &Bundle) -> Option<JoinHandle<()>> {
        let hook = self.hooks.get(event)?.clone();
        let bundle = bundle.clone();
        let environment = self.environment.clone();
        let policy = self.policy;

        tracing::info!(
            hook = event.hook_name(),
            bundle_id = %bundle.id,
            version = %bundle.version,
            "triggering lifecycle hook"
        );

        Some(tokio::spawn(async move {
            let result = policy
                .run(|| hook.call(&bundle, &environment))
                .await;

            match result {
                Ok(()) => tracing::debug!(
                    hook = event.hook_name(),
                    bundle_id = %bundle.id,
                    "lifecycle hook completed"
                ),
                Err(err) => tracing::error!(
                    hook = event.hook_name(),
                    bundle_id = %bundle.id,
                    version = %bundle.version,
                    retries = policy.max_retries,
                    error = %format!("{err:#}"),
                    "lifecycle hook failed after exhausting retries"
                ),
            }
        }))
    }
}
