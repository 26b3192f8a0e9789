//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML file, and
//! every section has defaults so an empty file is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Command client behaviour (retry, auth, cache, timeout).
    pub client: ClientConfig,

    /// Where commands are sent.
    pub transport: TransportConfig,

    /// Token sources and the refresh command.
    pub credentials: CredentialsConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Per-client behaviour. Immutable once a client is built; use the
/// `with_*` helpers to derive a variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Total attempts for transient failures (first try included).
    pub retry_attempts: u32,

    /// Backoff base: attempt `n` waits `n * retry_delay_base_ms`.
    pub retry_delay_base_ms: u64,

    /// Inject the access token into every argument bag.
    pub enable_auth: bool,

    /// Retry timeouts and transport faults.
    pub enable_retry: bool,

    /// Cache successful results.
    pub enable_cache: bool,

    /// Lifetime of a cached result in milliseconds.
    pub cache_ttl_ms: u64,

    /// Upper bound on cached results.
    pub cache_max_entries: usize,

    /// Per-dispatch deadline in milliseconds.
    pub timeout_ms: u64,

    /// Reserved argument field that carries the access token.
    pub auth_field: String,

    /// Commands that are never cached (exact name or `prefix*`).
    pub uncached_commands: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_delay_base_ms: 1000,
            enable_auth: true,
            enable_retry: true,
            enable_cache: true,
            cache_ttl_ms: 5000,
            cache_max_entries: 200,
            timeout_ms: 30_000,
            auth_field: "_auth".to_string(),
            uncached_commands: Vec::new(),
        }
    }
}

impl ClientConfig {
    #[must_use = "returns a modified copy"]
    pub fn with_auth(mut self, enabled: bool) -> Self {
        self.enable_auth = enabled;
        self
    }

    #[must_use = "returns a modified copy"]
    pub fn with_retry(mut self, enabled: bool) -> Self {
        self.enable_retry = enabled;
        self
    }

    #[must_use = "returns a modified copy"]
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// False for commands listed in `uncached_commands`.
    pub fn is_cacheable(&self, command: &str) -> bool {
        !self.uncached_commands.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => command.starts_with(prefix),
            None => command == pattern,
        })
    }
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL of the command endpoint.
    pub endpoint: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:1420".to_string(),
        }
    }
}

/// Credential sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Environment variable holding the access token.
    pub access_token_env: String,

    /// Environment variable holding the refresh token.
    pub refresh_token_env: String,

    /// Backend command that exchanges a refresh token for an access token.
    pub refresh_command: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            access_token_env: "COMMAND_RELAY_ACCESS_TOKEN".to_string(),
            refresh_token_env: "COMMAND_RELAY_REFRESH_TOKEN".to_string(),
            refresh_command: "refresh_token".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}
