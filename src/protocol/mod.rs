//! Wire protocol subsystem.
//!
//! # Data Flow
//! ```text
//! transport result
//!     → envelope.rs (RawResponse: Enveloped | Legacy)
//!     → normalize() → Ok(Value) | Err(AppError)
//!     → error.rs (ErrorCode classification, auth flag)
//! ```

pub mod envelope;
pub mod error;

pub use envelope::{Envelope, RawResponse, WireError};
pub use error::{AppError, ErrorCode};
