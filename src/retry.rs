use std::fmt::Display;
use std::future::Future;

use tracing::warn;

use crate::config::RetryConfig;
use crate::error::Transient;

/// Runs `op` up to `retry.attempts` times, doubling the delay between
/// attempts starting from `retry.base_delay()`.
///
/// Only transient errors are retried; terminal errors and the final
/// failed attempt return the error to the caller.
pub async fn with_backoff<T, E, F, Fut>(retry: &RetryConfig, what: &str, mut op: F) -> Result<T, E>
where
    E: Transient + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delay = retry.base_delay();
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retry.attempts && err.is_transient() => {
                warn!(
                    "{what} failed (attempt {attempt}/{}): {err}; retrying in {delay:?}",
                    retry.attempts
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
