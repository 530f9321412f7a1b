//! Retries for idempotent backend reads.
//!
//! # Design Decisions
//! - Only reads are retried; writes surface their first failure so the
//!   caller can revert
//! - Only transient (network) errors are retried

use std::future::Future;

use crate::remote::StoreResult;
use crate::resilience::backoff::Backoff;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_ms: u64,
    pub max_ms: u64,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        base_ms: 0,
        max_ms: 0,
    };

    pub fn new(max_retries: u32, base_ms: u64) -> Self {
        Self {
            max_retries,
            base_ms,
            max_ms: base_ms.saturating_mul(16),
        }
    }
}

/// Run `op`, retrying transient failures according to `policy`.
pub async fn retry_transient<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut backoff = Backoff::new(policy.base_ms, policy.max_ms);
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && backoff.attempt() < policy.max_retries => {
                let delay = backoff.next_delay();
                tracing::debug!(
                    op = label,
                    attempt = backoff.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying backend read"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
