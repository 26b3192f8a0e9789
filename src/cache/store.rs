//! TTL cache with in-flight request deduplication.
//!
//! # Responsibilities
//! - Store command results until their TTL elapses (lazy expiry on read)
//! - Bound memory by evicting the oldest entry at capacity
//! - Index in-flight producers so one key has at most one producer running
//!
//! # Design Decisions
//! - Entries live behind a short `std::sync::Mutex`; never held across `.await`
//! - Pending requests live in a `DashMap` so check-and-register is atomic per key
//! - A pending request removes itself when it settles, success or failure
//! - `clear()` bumps a generation; producers started before it do not store
//! - `Value::Null` results are handed back but never stored

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::protocol::AppError;

/// Future shared by every caller waiting on the same key.
pub type SharedResult = Shared<BoxFuture<'static, Result<Value, AppError>>>;

/// A stored value and its deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// A producer that has been started and not yet settled.
#[derive(Clone)]
pub struct PendingRequest {
    pub result: SharedResult,
    pub started_at: Instant,
    id: u64,
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub pending: usize,
    pub max_entries: usize,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
}

impl Entries {
    fn remove(&mut self, key: &str) -> bool {
        if self.map.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| !entry.is_expired(now));
        let map = &self.map;
        self.order.retain(|k| map.contains_key(k));
        before - self.map.len()
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let key = self.order.pop_front()?;
        self.map.remove(&key);
        Some(key)
    }
}

struct CacheInner {
    entries: Mutex<Entries>,
    pending: DashMap<String, PendingRequest>,
    next_pending_id: AtomicU64,
    generation: AtomicU64,
    max_entries: usize,
    default_ttl: Duration,
}

impl CacheInner {
    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, key: String, value: Value, ttl: Duration) {
        if value.is_null() {
            return;
        }
        let now = Instant::now();
        let mut entries = self.entries();

        if !entries.map.contains_key(&key) && entries.map.len() >= self.max_entries {
            if entries.purge_expired(now) == 0 {
                if let Some(evicted) = entries.evict_oldest() {
                    tracing::debug!(key = %evicted, "Cache full, evicted oldest entry");
                }
            }
        }

        let entry = CacheEntry {
            value,
            expires_at: now + ttl,
        };
        if entries.map.insert(key.clone(), entry).is_none() {
            entries.order.push_back(key.clone());
        }
        metrics::record_cache_size(entries.map.len());
        tracing::debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cache set");
    }
}

/// Shared handle to one cache; clones see the same entries.
#[derive(Clone)]
pub struct TtlCache {
    inner: Arc<CacheInner>,
}

impl TtlCache {
    /// Create a cache holding at most `max_entries` values.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(Entries::default()),
                pending: DashMap::new(),
                next_pending_id: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                max_entries: max_entries.max(1),
                default_ttl,
            }),
        }
    }

    /// Return a live value, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.inner.entries();
        match entries.map.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(Instant::now()) => {
                return Some(entry.value.clone());
            }
            Some(_) => {}
        }
        entries.remove(key);
        metrics::record_cache_size(entries.map.len());
        None
    }

    /// Store with the default TTL.
    pub fn set(&self, key: &str, value: Value) {
        self.inner.insert(key.to_string(), value, self.inner.default_ttl);
    }

    /// Store with an explicit TTL.
    pub fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) {
        self.inner.insert(key.to_string(), value, ttl);
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.inner.entries();
        let removed = entries.remove(key);
        metrics::record_cache_size(entries.map.len());
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Return the cached value, join an in-flight producer, or start one.
    ///
    /// `producer` is only called to build the future; it runs at most once per
    /// key while a previous run is still in flight.
    pub async fn get_or_set<F, Fut>(&self, key: &str, producer: F, ttl: Duration) -> Result<Value, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
    {
        if let Some(value) = self.get(key) {
            tracing::debug!(key = %key, "Cache hit");
            metrics::record_cache_lookup("hit");
            return Ok(value);
        }

        let shared = match self.inner.pending.entry(key.to_string()) {
            Entry::Occupied(pending) => {
                tracing::debug!(key = %key, "Joining in-flight request");
                metrics::record_cache_lookup("shared");
                pending.get().result.clone()
            }
            Entry::Vacant(slot) => {
                metrics::record_cache_lookup("miss");
                let id = self.inner.next_pending_id.fetch_add(1, Ordering::Relaxed);
                let inner = Arc::clone(&self.inner);
                let owned_key = key.to_string();
                let generation = self.inner.generation.load(Ordering::Acquire);
                let work = producer();

                let result = async move {
                    let outcome = work.await;
                    if let Ok(value) = &outcome {
                        if inner.generation.load(Ordering::Acquire) == generation {
                            inner.insert(owned_key.clone(), value.clone(), ttl);
                        } else {
                            tracing::debug!(key = %owned_key, "Cache cleared while producing, result not stored");
                        }
                    }
                    inner.pending.remove_if(&owned_key, |_, pending| pending.id == id);
                    outcome
                }
                .boxed()
                .shared();

                slot.insert(PendingRequest {
                    result: result.clone(),
                    started_at: Instant::now(),
                    id,
                });
                result
            }
        };

        shared.await
    }

    /// Drop every entry (no pattern) or those whose key matches `pattern`.
    ///
    /// The pattern is a regular expression; one that fails to compile is
    /// matched as a plain substring. Returns the number of entries removed.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut entries = self.inner.entries();
        let removed = match pattern {
            None => {
                let count = entries.map.len();
                entries.map.clear();
                entries.order.clear();
                count
            }
            Some(pattern) => {
                let matcher = KeyMatcher::new(pattern);
                let doomed: Vec<String> = entries
                    .map
                    .keys()
                    .filter(|key| matcher.matches(key))
                    .cloned()
                    .collect();
                for key in &doomed {
                    entries.remove(key);
                }
                doomed.len()
            }
        };
        metrics::record_cache_size(entries.map.len());
        tracing::debug!(pattern = ?pattern, removed, "Cache invalidated");
        removed
    }

    /// Drop all entries and forget in-flight producers.
    ///
    /// Callers already awaiting a producer still receive its result, but that
    /// result is not stored.
    pub fn clear(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.invalidate(None);
        self.inner.pending.clear();
    }

    /// Remove expired entries eagerly.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.inner.entries();
        let purged = entries.purge_expired(Instant::now());
        metrics::record_cache_size(entries.map.len());
        purged
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.entries().map.len(),
            pending: self.inner.pending.len(),
            max_entries: self.inner.max_entries,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }
}

enum KeyMatcher<'a> {
    Regex(Regex),
    Substring(&'a str),
}

impl<'a> KeyMatcher<'a> {
    fn new(pattern: &'a str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => KeyMatcher::Regex(regex),
            Err(e) => {
                tracing::warn!(pattern, error = %e, "Invalid invalidation regex, matching as substring");
                KeyMatcher::Substring(pattern)
            }
        }
    }

    fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatcher::Regex(regex) => regex.is_match(key),
            KeyMatcher::Substring(needle) => key.contains(needle),
        }
    }
}
