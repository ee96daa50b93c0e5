use std::{fmt, future::Future, time::Duration};

use tracing::warn;

/// Bounded retry with exponential backoff (`base_delay * 2^n`, capped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn defaults() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Wait after the `failures`-th consecutive failure (1-based).
    pub fn delay_after(&self, failures: u32) -> Duration {
        let multiplier = 2_u32.saturating_pow(failures.saturating_sub(1));
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Outcome of one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<E> {
    /// Worth trying again after the backoff delay.
    Transient(E),
    /// Retrying cannot help; give up immediately.
    Permanent(E),
}

/// The last error seen once the policy stopped retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaveUp<E> {
    pub last: E,
    pub attempts: u32,
}

/// Drive `op` until it succeeds, fails permanently, or the attempt budget is
/// spent. `op` receives the 1-based attempt number.
pub async fn with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, GaveUp<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(Attempt::Permanent(last)) => {
                return Err(GaveUp {
                    last,
                    attempts: attempt,
                });
            }
            Err(Attempt::Transient(last)) if attempt >= max_attempts => {
                return Err(GaveUp {
                    last,
                    attempts: attempt,
                });
            }
            Err(Attempt::Transient(err)) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "[{label}] attempt {attempt}/{max_attempts} failed, \
                     retrying in {delay:?}: {err}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
