//! Lifecycle events that can trigger hooks

use serde::{Deserialize, Serialize};
use std::fmt;

/// A bundle state transition observable by lifecycle hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
    /// A bundle id was reserved and persisted
    Reserve,
    /// Platform artifacts were uploaded for a bundle
    Push,
    /// A bundle was disposed
    Dispose,
    /// A tag was rolled back by disposing its latest bundle
    Rollback,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 4] = [
        LifecycleEvent::Reserve,
        LifecycleEvent::Push,
        LifecycleEvent::Dispose,
        LifecycleEvent::Rollback,
    ];

    /// Stable hook name, used in logs and configuration.
    pub fn hook_name(&self) -> &'static str {
        match self {
            LifecycleEvent::Reserve => "onBundleReserve",
            LifecycleEvent::Push => "onBundlePush",
            LifecycleEvent::Dispose => "onBundleDispose",
            LifecycleEvent::Rollback => "onBundleRollback",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hook_name())
    }
}
