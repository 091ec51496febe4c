//! Bounded retry for remote calls.
//!
//! A [`RetryPolicy`] caps the total number of attempts and optionally spaces
//! them with a capped exponential delay. [`retry`] only retries failures the
//! caller's predicate accepts; everything else is returned immediately.

use std::{fmt::Display, future::Future, time::Duration};

use serde::{Deserialize, Serialize};

/// Attempt cap used for room joins.
pub const DEFAULT_JOIN_ATTEMPTS: u32 = 5;

/// Retry bound and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    /// Policy with `max_attempts` total attempts and exponential spacing.
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self { max_attempts, base_delay_ms, max_delay_ms }
    }

    /// Policy that retries back-to-back without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, 0, 0)
    }

    /// Total attempts including the first. Never less than one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the first retry.
    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }

    /// Upper bound for any single delay.
    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms
    }

    /// Delay to wait after failed attempt number `attempt` (zero-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.min(20);
        let multiplier = 1_u64 << shift;
        let bounded = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(bounded)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(DEFAULT_JOIN_ATTEMPTS)
    }
}

/// Run `op` until it succeeds, fails with an error `should_retry` rejects, or
/// the policy's attempt cap is reached.
///
/// The same operation is re-invoked unchanged on every attempt. The last error
/// is returned when attempts run out.
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, mut op: F, should_retry: P) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && should_retry(&err) => {
                let delay = policy.delay_for_attempt(attempt - 1);
                tracing::warn!(attempt, max_attempts, ?delay, error = %err, "retrying after transient failure");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            },
            Err(err) => return Err(err),
        }
    }
}
