//! Command client subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → invoker.rs (CommandClient::invoke with InvokeOptions from options.rs)
//!     → cache → resilience → auth → transport → protocol
//!     → Ok(Value) | Err(AppError)
//! ```

mod invoker;
mod options;

pub use invoker::{CommandClient, CommandClientBuilder};
pub use options::InvokeOptions;
