//! Timeout helpers.
//!
//! The protocol blocks on every receive by default. These helpers are only used
//! when a timeout has been configured explicitly.

use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Run `fut` to completion, or fail with [`ProtocolError::Timeout`] after `duration`
pub async fn with_timeout_error<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}

/// Like [`with_timeout_error`], but waits forever when `duration` is `None`
pub async fn maybe_with_timeout<F, T>(fut: F, duration: Option<Duration>) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match duration {
        Some(duration) => with_timeout_error(fut, duration).await,
        None => fut.await,
    }
}
