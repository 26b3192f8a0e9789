//! Credential collaborators.
//!
//! # Responsibilities
//! - `CredentialStore`: hand out the current access token, forget it on logout
//! - `TokenRefresher`: obtain a fresh access token
//!
//! # Security Constraints
//! - Tokens are never logged
//! - Tokens come from memory or environment variables only

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::protocol::AppError;
use crate::resilience::with_timeout;
use crate::transport::Transport;

/// Source of the access token injected into each call.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current token, or `None` when signed out.
    async fn access_token(&self) -> Result<Option<String>, AppError>;

    /// Forget all credentials.
    async fn clear(&self);
}

/// Capability that renews the access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// `Ok(true)` when a new token is now available.
    async fn refresh_access_token(&self) -> Result<bool, AppError>;
}

/// In-process token holder.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    access: ArcSwapOption<String>,
    refresh: ArcSwapOption<String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access: Option<String>, refresh: Option<String>) -> Self {
        Self {
            access: ArcSwapOption::from(access.map(Arc::new)),
            refresh: ArcSwapOption::from(refresh.map(Arc::new)),
        }
    }

    /// Read both tokens from environment variables; unset or empty means absent.
    pub fn from_env(access_var: &str, refresh_var: &str) -> Self {
        let read = |var: &str| std::env::var(var).ok().filter(|v| !v.is_empty());
        let store = Self::with_tokens(read(access_var), read(refresh_var));
        tracing::debug!(
            has_access_token = store.access.load().is_some(),
            has_refresh_token = store.refresh.load().is_some(),
            "Credentials loaded from environment"
        );
        store
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        self.access.store(Some(Arc::new(token.into())));
    }

    pub fn set_refresh_token(&self, token: impl Into<String>) {
        self.refresh.store(Some(Arc::new(token.into())));
    }

    pub fn refresh_token(&self) -> Option<Arc<String>> {
        self.refresh.load_full()
    }

    pub fn has_access_token(&self) -> bool {
        self.access.load().is_some()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn access_token(&self) -> Result<Option<String>, AppError> {
        Ok(self.access.load_full().map(|token| token.as_ref().clone()))
    }

    async fn clear(&self) {
        self.access.store(None);
        self.refresh.store(None);
    }
}

/// Refresher for deployments without a refresh flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefresh;

#[async_trait]
impl TokenRefresher for NoRefresh {
    async fn refresh_access_token(&self) -> Result<bool, AppError> {
        Ok(false)
    }
}

/// Renews the access token by sending the refresh command over the raw transport.
///
/// Sends `{ "refresh_token": ... }` and expects `{ "access_token": ... }` back,
/// optionally with a rotated `refresh_token`.
pub struct CommandRefresher {
    transport: Arc<dyn Transport>,
    store: Arc<MemoryCredentialStore>,
    command: String,
    timeout: Duration,
}

impl CommandRefresher {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<MemoryCredentialStore>,
        command: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl TokenRefresher for CommandRefresher {
    async fn refresh_access_token(&self) -> Result<bool, AppError> {
        let Some(refresh_token) = self.store.refresh_token() else {
            tracing::warn!("No refresh token available");
            return Ok(false);
        };

        let args = json!({ "refresh_token": refresh_token.as_str() });
        let raw = with_timeout(self.timeout, self.transport.invoke(&self.command, args)).await??;
        let payload = raw.normalize()?;

        match payload.get("access_token").and_then(Value::as_str) {
            Some(token) => {
                self.store.set_access_token(token);
                if let Some(rotated) = payload.get("refresh_token").and_then(Value::as_str) {
                    self.store.set_refresh_token(rotated);
                }
                Ok(true)
            }
            None => {
                tracing::warn!(command = %self.command, "Refresh response carried no access token");
                Ok(false)
            }
        }
    }
}
