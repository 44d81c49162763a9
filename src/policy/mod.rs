//! Timeout and retry policy applied to every store call.
//!
//! An [`ExecutionPolicy`] puts a hard deadline on each attempt and owns an
//! ordered list of [`RetryTier`]s, innermost first. A failure is retried by
//! the first tier whose trigger matches and whose budget is not spent; when
//! a tier fires, the budgets of the tiers inside it start over, the same way
//! nested retry loops would.

use crate::store::{StoreFailure, StoreResult};
use log::warn;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Which failures a tier retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryTrigger {
    /// Temporary failure or backpressure reported by the store.
    Overloaded,
    /// The attempt exceeded its deadline.
    Timeout,
}

impl RetryTrigger {
    pub fn matches(&self, failure: &StoreFailure) -> bool {
        match self {
            Self::Overloaded => matches!(failure, StoreFailure::Overloaded(_)),
            Self::Timeout => matches!(failure, StoreFailure::Timeout(_)),
        }
    }
}

/// One retry tier: trigger, fixed delay, and how many retries it may spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryTier {
    pub trigger: RetryTrigger,
    pub delay_ms: u64,
    pub max_retries: u32,
}

impl RetryTier {
    pub fn new(trigger: RetryTrigger, delay_ms: u64, max_retries: u32) -> Self {
        Self {
            trigger,
            delay_ms,
            max_retries,
        }
    }

    /// Tier 1: up to 3 retries, 200 ms apart.
    pub fn overloaded() -> Self {
        Self::new(RetryTrigger::Overloaded, 200, 3)
    }

    /// Tier 2: a single retry after 500 ms.
    pub fn timeout() -> Self {
        Self::new(RetryTrigger::Timeout, 500, 1)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPolicy {
    timeout: Duration,
    tiers: Vec<RetryTier>,
}

impl ExecutionPolicy {
    /// A policy with a deadline and no retries.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            tiers: Vec::new(),
        }
    }

    /// The two-tier policy: overload retries inside a single timeout retry.
    pub fn standard(timeout: Duration) -> Self {
        Self::new(timeout)
            .with_tier(RetryTier::overloaded())
            .with_tier(RetryTier::timeout())
    }

    /// Adds a tier outside the ones already present.
    pub fn with_tier(mut self, tier: RetryTier) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn tiers(&self) -> &[RetryTier] {
        &self.tiers
    }

    /// Upper bound on attempts one call to [`run`](Self::run) can make.
    pub fn max_attempts(&self) -> u64 {
        self.tiers
            .iter()
            .fold(1u64, |attempts, tier| {
                attempts.saturating_mul(u64::from(tier.max_retries) + 1)
            })
    }

    /// Runs `operation` under the deadline, retrying per tier.
    ///
    /// Attempts are strictly sequential. The failure returned is the last one
    /// observed once no tier can take it.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut spent = vec![0u32; self.tiers.len()];
        let mut attempt = 1u64;

        loop {
            let outcome = match timeout(self.timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(StoreFailure::Timeout(self.timeout)),
            };

            let failure = match outcome {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            let Some(index) = self.tiers.iter().enumerate().position(|(index, tier)| {
                tier.trigger.matches(&failure) && spent[index] < tier.max_retries
            }) else {
                return Err(failure);
            };

            spent[index] += 1;
            for inner in &mut spent[..index] {
                *inner = 0;
            }

            let tier = &self.tiers[index];
            warn!(
                "{} retry on {:?} (attempt {}, tier retry {} of {}): {} (delay={}ms)",
                label,
                tier.trigger,
                attempt,
                spent[index],
                tier.max_retries,
                failure,
                tier.delay_ms
            );
            sleep(tier.delay()).await;
            attempt += 1;
        }
    }
}
