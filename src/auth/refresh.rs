//! Single-flight token refresh.
//!
//! # States
//! - Idle: no refresh running
//! - Refreshing: one shared refresh future is stored
//!
//! # State Transitions
//! ```text
//! Idle → Refreshing: first caller starts the refresher
//! Refreshing → Refreshing: later callers join the stored future
//! Refreshing → Idle: the future settles (success or failure) and clears itself
//! ```
//!
//! The refresher runs exactly once per cycle no matter how many callers wait.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::auth::credentials::TokenRefresher;
use crate::observability::metrics;

type SharedRefresh = Shared<BoxFuture<'static, bool>>;

#[derive(Default)]
struct RefreshState {
    in_flight: Option<SharedRefresh>,
}

/// Coordinates refreshes for every call made through one client context.
#[derive(Clone)]
pub struct RefreshCoordinator {
    refresher: Arc<dyn TokenRefresher>,
    state: Arc<Mutex<RefreshState>>,
}

impl RefreshCoordinator {
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            refresher,
            state: Arc::new(Mutex::new(RefreshState::default())),
        }
    }

    /// True while a refresh cycle is in progress.
    pub fn is_refreshing(&self) -> bool {
        lock(&self.state).in_flight.is_some()
    }

    /// Start a refresh, or join the one already running. Resolves to whether
    /// a fresh credential is available; refresher errors count as failure.
    pub async fn refresh(&self) -> bool {
        let shared = {
            let mut state = lock(&self.state);
            match state.in_flight.clone() {
                Some(existing) => {
                    tracing::debug!("Joining in-progress token refresh");
                    metrics::record_token_refresh("joined");
                    existing
                }
                None => {
                    let cycle = self.start_cycle();
                    state.in_flight = Some(cycle.clone());
                    cycle
                }
            }
        };
        shared.await
    }

    fn start_cycle(&self) -> SharedRefresh {
        let refresher = Arc::clone(&self.refresher);
        let state = Arc::clone(&self.state);

        async move {
            tracing::info!("Refreshing access token");
            let refreshed = match refresher.refresh_access_token().await {
                Ok(refreshed) => refreshed,
                Err(e) => {
                    tracing::error!(error = %e, "Error during token refresh");
                    false
                }
            };

            lock(&state).in_flight = None;

            if refreshed {
                tracing::info!("Access token refreshed");
                metrics::record_token_refresh("success");
            } else {
                tracing::warn!("Access token refresh failed");
                metrics::record_token_refresh("failure");
            }
            refreshed
        }
        .boxed()
        .shared()
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
