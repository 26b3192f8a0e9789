//! Timeout enforcement.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the losing future is dropped
//! - A timeout is a `NETWORK_ERROR`, so the retry loop treats it as transient

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::protocol::AppError;

/// Error reported when `limit` elapses first.
pub fn timeout_error(limit: Duration) -> AppError {
    AppError::network(format!("Timeout after {}ms", limit.as_millis()), None)
}

/// Race `fut` against a timer of `limit`.
pub async fn with_timeout<F>(limit: Duration, fut: F) -> Result<F::Output, AppError>
where
    F: Future,
{
    timeout(limit, fut).await.map_err(|_| timeout_error(limit))
}
