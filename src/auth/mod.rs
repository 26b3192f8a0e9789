//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! outgoing call
//!     → credentials.rs (CredentialStore: current access token, injected into args)
//!
//! UNAUTHORIZED / TOKEN_EXPIRED response
//!     → refresh.rs (single-flight: one TokenRefresher run per cycle)
//!     → success: client retries the call once
//!     → failure: credentials cleared, signal.rs broadcasts LoggedOut
//! ```
//!
//! # Security Constraints
//! - Tokens are never logged
//! - A missing token is not an error; the call goes out unauthenticated

pub mod credentials;
pub mod refresh;
pub mod signal;

pub use credentials::{CommandRefresher, CredentialStore, MemoryCredentialStore, NoRefresh, TokenRefresher};
pub use refresh::RefreshCoordinator;
pub use signal::{AuthEvent, AuthSignal};
