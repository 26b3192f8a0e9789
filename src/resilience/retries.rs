//! Retry logic.
//!
//! # Responsibilities
//! - Classify each dispatch as success, transient, fatal or auth-expired
//! - Re-run transient failures with linear backoff up to the attempt budget
//! - Surface the last observed error unchanged once the budget is spent
//!
//! # Design Decisions
//! - Only timeouts and transport faults are transient
//! - Backend `success: false` failures are never retried here
//! - Auth failures are handed back untouched; the client owns the refresh path

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::observability::metrics;
use crate::protocol::AppError;
use crate::resilience::backoff::calculate_backoff;

/// Result of one dispatch, branched on by the retry loop.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Ok(Value),
    /// Timeout or transport fault.
    Retryable(AppError),
    /// Business failure or unclassified value.
    Fatal(AppError),
    /// `UNAUTHORIZED` / `TOKEN_EXPIRED` from the backend.
    AuthExpired(AppError),
}

impl DispatchOutcome {
    /// Classify a normalized backend response.
    pub fn from_response(response: Result<Value, AppError>) -> Self {
        match response {
            Ok(value) => DispatchOutcome::Ok(value),
            Err(err) if err.is_auth_error() => DispatchOutcome::AuthExpired(err),
            Err(err) => DispatchOutcome::Fatal(err),
        }
    }

    pub fn into_result(self) -> Result<Value, AppError> {
        match self {
            DispatchOutcome::Ok(value) => Ok(value),
            DispatchOutcome::Retryable(err)
            | DispatchOutcome::Fatal(err)
            | DispatchOutcome::AuthExpired(err) => Err(err),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchOutcome::Retryable(_))
    }
}

/// Attempt budget and backoff base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one.
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
        }
    }

    /// Single attempt, no backoff.
    pub fn disabled() -> Self {
        Self::new(1, 0)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms)
    }

    /// Drive `attempt_fn` until it yields a terminal outcome or the budget runs out.
    ///
    /// `attempt_fn` receives the 1-indexed attempt number.
    pub async fn run<F, Fut>(&self, command: &str, mut attempt_fn: F) -> Result<Value, AppError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = DispatchOutcome>,
    {
        let mut attempt = 1;
        loop {
            let err = match attempt_fn(attempt).await {
                DispatchOutcome::Ok(value) => return Ok(value),
                DispatchOutcome::Fatal(err) | DispatchOutcome::AuthExpired(err) => return Err(err),
                DispatchOutcome::Retryable(err) => err,
            };

            if attempt >= self.max_attempts {
                tracing::error!(
                    command,
                    attempts = attempt,
                    error = %err,
                    "Command failed after all attempts"
                );
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            tracing::warn!(
                command,
                attempt,
                max_attempts = self.max_attempts,
                delay = ?delay,
                error = %err,
                "Retrying command"
            );
            metrics::record_retry(command);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
