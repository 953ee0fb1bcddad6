//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::ProbeError;

/// Wrap a future with a wall-clock timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, ProbeError>>,
) -> Result<T, ProbeError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(duration)),
    }
}
