//! Utility functions shared by transports.

use crate::config::{
    TRANSPORT_INITIAL_BACKOFF_MS, TRANSPORT_MAX_BACKOFF_MS, TRANSPORT_MAX_RETRIES,
};
use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Retry a transport operation with exponential backoff.
///
/// Intended for outbound replies that may fail on transient network errors.
/// Backoff starts at 500ms, is capped at 4s and jittered; at most 3 retries.
///
/// # Examples
///
/// ```no_run
/// use oxide_signal_core::utils::retry_transport_operation;
/// use anyhow::Result;
///
/// async fn send() -> Result<u32> {
///     Ok(42)
/// }
///
/// # async fn example() -> Result<()> {
/// let id = retry_transport_operation(|| async { send().await }).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the last error if every attempt fails.
pub async fn retry_transport_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(TRANSPORT_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TRANSPORT_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TRANSPORT_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Transport operation failed after {} retries: {}",
            TRANSPORT_MAX_RETRIES, e
        );
        e
    })
}
