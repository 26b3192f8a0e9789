//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! (command, args)
//!     → key.rs (canonical CacheKey, field-order independent)
//!     → store.rs get_or_set:
//!         hit      → cached value
//!         pending  → join the in-flight future
//!         miss     → run producer, store on success, drop pending on settle
//! ```

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheEntry, CacheStats, PendingRequest, TtlCache};
