//! Lifecycle hook callbacks

use async_trait::async_trait;
use bifrost_types::{Bundle, LifecycleEvent};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// External callback fired after a bundle state transition has been
/// committed.
///
/// Errors are retried by the dispatcher and then logged; they never reach the
/// request that caused the transition.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    async fn call(&self, bundle: &Bundle, environment: &str) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`LifecycleHook`].
pub struct FnHook<F>(F);

impl<F, Fut> FnHook<F>
where
    F: Fn(Bundle, String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> LifecycleHook for FnHook<F>
where
    F: Fn(Bundle, String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn call(&self, bundle: &Bundle, environment: &str) -> anyhow::Result<()> {
        (self.0)(bundle.clone(), environment.to_string()).await
    }
}

/// Wrap an async closure as a shareable hook.
pub fn hook_fn<F, Fut>(f: F) -> Arc<dyn LifecycleHook>
where
    F: Fn(Bundle, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHook::new(f))
}

/// The configured hooks, at most one per lifecycle event.
///
/// Built once at startup and immutable afterwards.
#[derive(Clone, Default)]
pub struct HookSet {
    pub on_reserve: Option<Arc<dyn LifecycleHook>>,
    pub on_push: Option<Arc<dyn LifecycleHook>>,
    pub on_dispose: Option<Arc<dyn LifecycleHook>>,
    pub on_rollback: Option<Arc<dyn LifecycleHook>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hook for one event, replacing any previous one.
    pub fn with(mut self, event: LifecycleEvent, hook: Arc<dyn LifecycleHook>) -> Self {
        *self.slot_mut(event) = Some(hook);
        self
    }

    pub fn get(&self, event: LifecycleEvent) -> Option<&Arc<dyn LifecycleHook>> {
        match event {
            LifecycleEvent::Reserve => self.on_reserve.as_ref(),
            LifecycleEvent::Push => self.on_push.as_ref(),
            LifecycleEvent::Dispose => self.on_dispose.as_ref(),
            LifecycleEvent::Rollback => self.on_rollback.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        LifecycleEvent::ALL.iter().all(|e| self.get(*e).is_none())
    }

    fn slot_mut(&mut self, event: LifecycleEvent) -> &mut Option<Arc<dyn LifecycleHook>> {
        match event {
            LifecycleEvent::Reserve => &mut self.on_reserve,
            LifecycleEvent::Push => &mut self.on_push,
            LifecycleEvent::Dispose => &mut self.on_dispose,
            LifecycleEvent::Rollback => &mut self.on_rollback,
        }
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let configured = LifecycleEvent::ALL
            .iter()
            .filter(|e| self.get(**e).is_some())
            .map(|e| e.hook_name())
            .collect::<Vec<_>>();
        f.debug_struct("HookSet")
            .field("configured", &configured)
            .finish()
    }
}
