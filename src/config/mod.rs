//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → ClientConfig handed to each CommandClient
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; variants are derived copies
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ClientConfig, CredentialsConfig, ObservabilityConfig, RelayConfig, TransportConfig};
pub use validation::ValidationError;
