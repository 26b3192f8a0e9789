//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Command dispatch:
//!     → timeouts.rs (race the transport against the per-call deadline)
//!     → retries.rs (classify outcome; transient → backoff.rs delay → retry)
//! ```
//!
//! # Design Decisions
//! - Every dispatch has a deadline; it is the only cancellation primitive
//! - Retry decisions branch on `DispatchOutcome`, not on error inspection
//! - Backoff is linear without jitter

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{DispatchOutcome, RetryPolicy};
pub use timeouts::with_timeout;
