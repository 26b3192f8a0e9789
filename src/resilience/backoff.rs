//! Linear backoff.

use std::time::Duration;

/// Delay after failed attempt `attempt` (1-indexed): `base_ms * attempt`, no jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(u64::from(attempt)))
}
