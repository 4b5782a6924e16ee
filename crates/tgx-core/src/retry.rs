use std::{future::Future, time::Duration};

use tokio::time::sleep;

/// Run `op` up to `max_attempts` times, sleeping `interval` between failed attempts.
///
/// Returns on the first success, otherwise the error of the last attempt unchanged.
/// There is no sleep after the final attempt. `max_attempts` of 0 behaves like 1.
pub async fn retry<T, E, F, Fut>(max_attempts: usize, interval: Duration, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(_) => {
                attempt += 1;
                sleep(interval).await;
            }
        }
    }
}
