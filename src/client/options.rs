//! Per-call overrides.

use std::time::Duration;

/// Overrides applied to a single `invoke`; `None` falls back to the client config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeOptions {
    pub auth: Option<bool>,
    pub retry: Option<bool>,
    pub cache: Option<bool>,
    pub timeout: Option<Duration>,
    pub ttl: Option<Duration>,
}

impl InvokeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_auth(mut self, enabled: bool) -> Self {
        self.auth = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, enabled: bool) -> Self {
        self.retry = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cache lifetime for this call's result.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}
