//! Exponential-backoff retry for transient venue errors.
//!
//! Generalises the circuit-breaker/backoff shape used for the long-lived
//! reconnecting data stream in the prediction-market codebase this crate
//! grew from, down to a single retried request: bounded attempts, jittered
//! exponential delay, and a hard split between retryable transport errors
//! and everything else (auth, invalid input, business rejection), which are
//! never retried.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::VenueError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 200,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let raw = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = raw.min(self.max_delay_ms as f64) as u64;
        let jittered = rand::thread_rng().gen_range(capped / 2..=capped.max(1));
        Duration::from_millis(jittered)
    }
}

/// Runs `f` up to `policy.max_attempts` times. Retries only when the error
/// classifies as retryable (`VenueError::is_retryable`); any other error, or
/// exhaustion of the attempt budget, returns immediately.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut f: F) -> Result<T, VenueError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VenueError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(attempt, delay_ms = delay.as_millis(), error = %e, "retrying after transient error");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 0 {
                    debug!(attempts = attempt + 1, "retry budget exhausted or non-retryable error");
                }
                return Err(e);
            }
        }
    }
}
