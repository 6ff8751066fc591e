//! Retry wrapper for conflicting mutations
//!
//! Several services serialize mutations per resource: while one operation
//! is in progress, further mutating calls fail with a well-known conflict
//! code. Those failures are not errors from the caller's point of view,
//! they mean "try again in a moment". [`with_operation_retry`] re-issues
//! the mutating request while its failure matches a caller-supplied
//! transient predicate, bounded by its own timeout budget.
//!
//! This wraps the *mutating* request only. Status probes are never
//! retried here; the waiter in [`crate::wait`] owns that loop.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Repeat `action` while it fails with a transient error.
///
/// Returns the first success, the first non-transient error, or — once
/// `timeout` is exhausted — the last transient error unchanged.
pub async fn with_operation_retry<T, E, F, Fut, P>(
    timeout: Duration,
    retry_interval: Duration,
    is_transient: P,
    mut action: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let deadline = Instant::now() + timeout;
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match action().await {
            Ok(value) => return Ok(value),
            Err(err) if is_transient(&err) => {
                let now = Instant::now();
                if now >= deadline {
                    tracing::warn!(attempts, "operation still conflicting at deadline: {err}");
                    return Err(err);
                }
                tracing::debug!(attempts, "concurrent operation in progress, retrying: {err}");
                sleep_until(deadline.min(now + retry_interval)).await;
            }
            Err(err) => return Err(err),
        }
    }
}
