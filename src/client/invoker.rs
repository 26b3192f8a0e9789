//! Command client façade.
//!
//! # Responsibilities
//! - Serve cache-eligible calls through the TTL cache (deduplicated)
//! - Inject the access token into the argument bag
//! - Dispatch through the transport under a deadline and normalize the result
//! - Refresh credentials once on auth failure; if that fails, drop cached
//!   results and signal logout
//! - Retry transient failures with backoff
//!
//! # Pipeline
//! ```text
//! invoke ─▶ cache.get_or_set ─▶ RetryPolicy::run ─▶ dispatch_authenticated
//!                                                      │
//!                              ┌───────────────────────┘
//!                              ▼
//!              inject token ─▶ transport (timeout) ─▶ normalize ─▶ DispatchOutcome
//!                              ▲                                        │
//!                              └── refresh ok: retry once ◀─ AuthExpired┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::{AuthEvent, AuthSignal, CredentialStore, MemoryCredentialStore, NoRefresh, RefreshCoordinator, TokenRefresher};
use crate::cache::{CacheKey, CacheStats, TtlCache};
use crate::client::options::InvokeOptions;
use crate::config::ClientConfig;
use crate::observability::metrics;
use crate::protocol::{AppError, RawResponse};
use crate::resilience::{with_timeout, DispatchOutcome, RetryPolicy};
use crate::transport::Transport;

/// State shared by a client and every variant derived from it.
struct ClientContext {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    refresh: RefreshCoordinator,
    cache: TtlCache,
    auth_signal: AuthSignal,
}

/// Uniform, cached, retried, authenticated command interface.
///
/// Cloning is cheap; clones and `without_*` variants share the cache, the
/// refresh coordinator, the credential store and the auth signal.
#[derive(Clone)]
pub struct CommandClient {
    config: Arc<ClientConfig>,
    context: Arc<ClientContext>,
}

/// Builder for [`CommandClient`].
pub struct CommandClientBuilder {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    credentials: Option<Arc<dyn CredentialStore>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    auth_signal: Option<AuthSignal>,
}

impl CommandClientBuilder {
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    #[must_use]
    pub fn auth_signal(mut self, signal: AuthSignal) -> Self {
        self.auth_signal = Some(signal);
        self
    }

    pub fn build(self) -> CommandClient {
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));
        let refresher = self.refresher.unwrap_or_else(|| Arc::new(NoRefresh));
        let cache = TtlCache::new(self.config.cache_max_entries, self.config.cache_ttl());

        tracing::debug!(
            retry_attempts = self.config.retry_attempts,
            enable_auth = self.config.enable_auth,
            enable_cache = self.config.enable_cache,
            timeout_ms = self.config.timeout_ms,
            "Command client initialized"
        );

        CommandClient {
            config: Arc::new(self.config),
            context: Arc::new(ClientContext {
                transport: self.transport,
                credentials,
                refresh: RefreshCoordinator::new(refresher),
                cache,
                auth_signal: self.auth_signal.unwrap_or_default(),
            }),
        }
    }
}

impl CommandClient {
    pub fn builder(transport: Arc<dyn Transport>) -> CommandClientBuilder {
        CommandClientBuilder {
            transport,
            config: ClientConfig::default(),
            credentials: None,
            refresher: None,
            auth_signal: None,
        }
    }

    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self::builder(transport)
            .config(config)
            .credentials(credentials)
            .refresher(refresher)
            .build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Variant with a different configuration over the same shared context.
    pub fn with_config(&self, config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
            context: Arc::clone(&self.context),
        }
    }

    /// Variant for public commands: no token injection.
    pub fn without_auth(&self) -> Self {
        self.with_config(self.config.as_ref().clone().with_auth(false))
    }

    /// Variant for one-shot commands: a single attempt.
    pub fn without_retry(&self) -> Self {
        self.with_config(self.config.as_ref().clone().with_retry(false))
    }

    pub fn without_cache(&self) -> Self {
        self.with_config(self.config.as_ref().clone().with_cache(false))
    }

    /// Invoke `command` and return its normalized payload.
    pub async fn invoke(&self, command: &str, args: Value, options: InvokeOptions) -> Result<Value, AppError> {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!("invoke", command, %request_id);
        let start = Instant::now();

        let result = self.invoke_inner(command, args, options).instrument(span).await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::record_invocation(command, outcome, start);
        result
    }

    /// Invoke and decode the payload into `T`.
    pub async fn invoke_as<T>(&self, command: &str, args: Value, options: InvokeOptions) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        let value = self.invoke(command, args, options).await?;
        serde_json::from_value(value).map_err(|e| {
            AppError::unknown(format!("Unexpected response shape for '{command}'"), Some(e.to_string()))
        })
    }

    /// One dispatch with no auth, retry, cache or normalization.
    pub async fn invoke_raw(&self, command: &str, args: Value) -> Result<RawResponse, AppError> {
        let raw = with_timeout(self.config.timeout(), self.context.transport.invoke(command, args)).await??;
        Ok(raw)
    }

    /// Drop cached results: all of them, or those whose key matches `pattern`.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        self.context.cache.invalidate(pattern)
    }

    pub fn clear_cache(&self) {
        self.context.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.context.cache.stats()
    }

    /// Receive `LoggedOut` whenever a failed refresh clears credentials.
    pub fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.context.auth_signal.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.context.refresh.is_refreshing()
    }

    async fn invoke_inner(&self, command: &str, args: Value, options: InvokeOptions) -> Result<Value, AppError> {
        let cacheable = self.config.enable_cache
            && options.cache.unwrap_or(true)
            && self.config.is_cacheable(command);

        if !cacheable {
            return self.execute(command, args, &options).await;
        }

        let key = CacheKey::new(command, &args);
        let ttl = options.ttl.unwrap_or_else(|| self.config.cache_ttl());
        let client = self.clone();
        let owned_command = command.to_string();

        self.context
            .cache
            .get_or_set(
                key.as_str(),
                move || async move { client.execute(&owned_command, args, &options).await },
                ttl,
            )
            .await
    }

    async fn execute(&self, command: &str, args: Value, options: &InvokeOptions) -> Result<Value, AppError> {
        let use_auth = options.auth.unwrap_or(self.config.enable_auth);
        let policy = if options.retry.unwrap_or(self.config.enable_retry) {
            RetryPolicy::new(self.config.retry_attempts, self.config.retry_delay_base_ms)
        } else {
            RetryPolicy::disabled()
        };
        let timeout = options.timeout.unwrap_or_else(|| self.config.timeout());

        policy
            .run(command, |attempt| {
                self.dispatch_authenticated(command, &args, use_auth, timeout, attempt)
            })
            .await
    }

    /// One attempt, plus a single post-refresh retry on auth failure that does
    /// not count against the retry budget.
    async fn dispatch_authenticated(
        &self,
        command: &str,
        args: &Value,
        use_auth: bool,
        timeout: Duration,
        attempt: u32,
    ) -> DispatchOutcome {
        let err = match self.dispatch_once(command, args, use_auth, timeout, attempt).await {
            DispatchOutcome::AuthExpired(err) => err,
            other => return other,
        };

        tracing::warn!(code = %err.code(), "Auth error detected, attempting refresh");
        if !self.context.refresh.refresh().await {
            tracing::error!("Token refresh failed, signalling logout");
            self.handle_auth_failure().await;
            return DispatchOutcome::AuthExpired(err);
        }

        tracing::debug!("Token refreshed, retrying request");
        match self.dispatch_once(command, args, use_auth, timeout, attempt).await {
            DispatchOutcome::AuthExpired(again) => {
                tracing::warn!(code = %again.code(), "Still unauthorized after refresh");
                DispatchOutcome::AuthExpired(again)
            }
            other => other,
        }
    }

    async fn dispatch_once(
        &self,
        command: &str,
        args: &Value,
        use_auth: bool,
        timeout: Duration,
        attempt: u32,
    ) -> DispatchOutcome {
        let args = if use_auth {
            self.inject_auth(args).await
        } else {
            args.clone()
        };

        tracing::debug!(attempt, "Dispatching command");
        match with_timeout(timeout, self.context.transport.invoke(command, args)).await {
            Err(timed_out) => DispatchOutcome::Retryable(timed_out),
            Ok(Err(fault)) if fault.is_transient() => DispatchOutcome::Retryable(fault.into()),
            Ok(Err(fault)) => DispatchOutcome::Fatal(fault.into()),
            Ok(Ok(raw)) => DispatchOutcome::from_response(raw.normalize()),
        }
    }

    /// Copy of `args` with the access token under the reserved field.
    ///
    /// No token, a store error, or a non-object argument bag all send the
    /// arguments unchanged.
    async fn inject_auth(&self, args: &Value) -> Value {
        let token = match self.context.credentials.access_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return args.clone(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read access token");
                return args.clone();
            }
        };

        let mut bag = match args {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => {
                tracing::debug!("Argument bag is not an object, sending without credential");
                return args.clone();
            }
        };
        bag.insert(self.config.auth_field.clone(), Value::String(token));
        Value::Object(bag)
    }

    /// Logout: forget credentials and everything fetched with them.
    async fn handle_auth_failure(&self) {
        self.context.credentials.clear().await;
        self.context.cache.clear();
        let listeners = self.context.auth_signal.emit_logged_out();
        tracing::info!(listeners, "Credentials cleared, logout signalled");
    }
}

impl std::fmt::Debug for CommandClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandClient")
            .field("config", &self.config)
            .field("cache", &self.context.cache.stats())
            .finish()
    }
}
