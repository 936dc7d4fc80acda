//! Exponential backoff for upstream calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::ChainError;

/// Retry an async provider operation with exponential backoff.
///
/// Only errors for which [`ChainError::is_retryable`] holds are retried;
/// anything else is returned immediately. `attempts` counts the first call.
pub async fn retry_async<F, Fut, T>(
    mut op: F,
    attempts: usize,
    initial_delay: Duration,
) -> Result<T, ChainError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    let mut delay = initial_delay;
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts && e.is_retryable() => {
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying provider call");
                sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
