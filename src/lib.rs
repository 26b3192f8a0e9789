//! Resilient command invocation layer.
//!
//! Turns a fallible command transport into a uniform, cached, retried,
//! authenticated call interface.
//!
//! ```rust,ignore
//! use command_relay::{CommandClient, HttpTransport, InvokeOptions};
//!
//! let transport = Arc::new(HttpTransport::new("http://127.0.0.1:1420")?);
//! let client = CommandClient::builder(transport).build();
//!
//! let klines = client
//!     .invoke("market_get_klines", json!({"symbol": "BTCUSDT", "limit": 100}), InvokeOptions::new())
//!     .await?;
//!
//! client.invalidate(Some("^market_"));
//! ```

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod observability;
pub mod protocol;
pub mod resilience;
pub mod transport;

pub use auth::{AuthEvent, CredentialStore, MemoryCredentialStore, TokenRefresher};
pub use client::{CommandClient, InvokeOptions};
pub use config::{ClientConfig, RelayConfig};
pub use protocol::{AppError, ErrorCode, RawResponse};
pub use transport::{HttpTransport, Transport, TransportFault};
