// Read-through response cache with per-entry time-to-live.
//
// Entries are keyed by (endpoint, parameters) and hold decoded JSON bodies.
// Time comes from `tokio::time::Instant`, so tests can pause and advance
// the clock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: &'static str,
    pub params: String,
}

impl CacheKey {
    pub fn new(endpoint: &'static str, params: impl Into<String>) -> Self {
        Self {
            endpoint,
            params: params.into(),
        }
    }
}

struct Entry {
    stored_at: Instant,
    ttl: Duration,
    body: Value,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

#[derive(Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries only ever hold complete bodies, so a poisoned lock is still
    /// safe to read.
    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached body for `key`, if present and not expired. Expired
    /// entries are evicted on lookup.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut entries = self.entries();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.body.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: CacheKey, ttl: Duration, body: Value) {
        let mut entries = self.entries();
        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                ttl,
                body,
            },
        );
    }

    /// Return the cached body for `key`, or run `fetch` and cache its result.
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: CacheKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(body) = self.get(&key) {
            debug!(endpoint = key.endpoint, params = %key.params, "cache hit");
            return Ok(body);
        }
        debug!(endpoint = key.endpoint, params = %key.params, "cache miss");
        let body = fetch().await?;
        if !ttl.is_zero() {
            self.insert(key, ttl, body.clone());
        }
        Ok(body)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
