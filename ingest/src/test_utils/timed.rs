use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

/// Default time a test waits for an operation before failing.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Awaits `future`, panicking if it doesn't complete within [`DEFAULT_TEST_TIMEOUT`].
pub async fn within<F>(future: F) -> F::Output
where
    F: Future,
{
    within_timeout(DEFAULT_TEST_TIMEOUT, future).await
}

/// Awaits `future`, panicking if it doesn't complete within `duration`.
///
/// # Panics
///
/// Panics when the duration elapses, so that a test fails fast rather than hanging.
pub async fn within_timeout<F>(duration: Duration, future: F) -> F::Output
where
    F: Future,
{
    match timeout(duration, future).await {
        Ok(output) => output,
        Err(_) => panic!("operation did not complete within {duration:?}"),
    }
}
