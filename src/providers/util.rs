use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries a fallible async request a fixed number of times, sleeping
/// `delay` between attempts. Total runs = 1 initial + `retries`. Error
/// statuses count as failures when the caller maps them via
/// `error_for_status`.
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay: Duration,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err.into());
                }
                debug!(
                    "Request attempt {}/{} failed: {}. Retrying...",
                    attempt,
                    retries + 1,
                    err
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}
