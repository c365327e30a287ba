//! Bifrost lifecycle hooks.
//!
//! State transitions (reserve, push, dispose, rollback) can notify external
//! systems. Hooks are best-effort:
//! - every call runs on a detached task, never on the request path
//! - failures are retried with backoff ([`RetryPolicy`], 5 retries,
//!   exponential by default)
//! - exhausted retries are logged and swallowed; the transition that fired
//!   the hook is already committed and stays that way

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod dispatcher;
pub mod hook;
pub mod retry;
pub mod slack;

pub use dispatcher::HookDispatcher;
pub use hook::{hook_fn, FnHook, HookSet, LifecycleHook};
pub use retry::{with_retry, DelayStrategy, Retriable, RetryPolicy};
pub use slack::{slack_hooks, SlackChannel, SlackHook, SlackMessage};
