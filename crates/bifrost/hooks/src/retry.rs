//! Bounded retry with configurable backoff.
//!
//! A policy allows `max_retries` retries after the first attempt, so an
//! operation runs at most `max_retries + 1` times. Between attempts the
//! calling task sleeps for `strategy.delay(n)`, where `n` is the 1-based retry
//! number. The last error is returned unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

const BASE_DELAY_MS: u64 = 1000;

/// Delay between attempts, as a function of the retry number.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayStrategy {
    /// `1000·n` ms
    Linear,
    /// `1000·2ⁿ` ms
    #[default]
    Exponential,
    /// `1000` ms
    Constant,
    /// Caller-supplied delay function.
    #[serde(skip)]
    Custom(fn(u32) -> Duration),
}

impl DelayStrategy {
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            DelayStrategy::Linear => {
                Duration::from_millis(BASE_DELAY_MS.saturating_mul(u64::from(retry)))
            }
            DelayStrategy::Exponential => Duration::from_millis(
                BASE_DELAY_MS.saturating_mul(2u64.saturating_pow(retry)),
            ),
            DelayStrategy::Constant => Duration::from_millis(BASE_DELAY_MS),
            DelayStrategy::Custom(f) => f(retry),
        }
    }
}

impl fmt::Debug for DelayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayStrategy::Linear => f.write_str("Linear"),
            DelayStrategy::Exponential => f.write_str("Exponential"),
            DelayStrategy::Constant => f.write_str("Constant"),
            DelayStrategy::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Retry budget and backoff for an operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub strategy: DelayStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            strategy: DelayStrategy::Exponential,
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

impl RetryPolicy {
    pub fn new(max_retries: u32, strategy: DelayStrategy) -> Self {
        Self {
            max_retries,
            strategy,
        }
    }

    /// Run `op` until it succeeds or the retry budget is spent.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut retry = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if retry >= self.max_retries => return Err(err),
                Err(err) => {
                    retry += 1;
                    let delay = self.strategy.delay(retry);
                    tracing::warn!(
                        attempt = retry,
                        max_retries = self.max_retries,
                        delay_ms = delay_millis(delay),
                        error = %err,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Whole milliseconds of `delay`, saturating at `u64::MAX`.
fn delay_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// An operation bound to a retry policy.
///
/// Calling it with some arguments behaves like calling the wrapped operation,
/// except that failures are retried. Arguments are cloned for each attempt.
pub struct Retriable<F> {
    op: F,
    policy: RetryPolicy,
}

/// Wrap `op` so every call goes through `policy`.
pub fn with_retry<F>(op: F, policy: RetryPolicy) -> Retriable<F> {
    Retriable { op, policy }
}

impl<F> Retriable<F> {
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn call<A, T, E, Fut>(&self, args: A) -> Result<T, E>
    where
        A: Clone,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.policy.run(|| (self.op)(args.clone())).await
    }
}
