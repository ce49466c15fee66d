//! Request-id keyed idempotency cache.
//!
//! A retried request carrying the same id within the TTL window is answered
//! from memory instead of re-running the provider chain. Expired entries are
//! swept on every access; there is no background task.
//!
//! Two concurrent first requests for the same id may both compute. The
//! second insert simply replaces the first.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A stored result.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub created_at: Instant,
    pub value: T,
}

/// Process-wide TTL map of request id to result.
pub struct IdempotencyCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> IdempotencyCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sweep(&self, entries: &mut HashMap<String, CacheEntry<T>>, now: Instant) {
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.created_at) < self.ttl);
        let dropped = before - entries.len();
        if dropped > 0 {
            tracing::debug!("Swept {dropped} expired cache entries");
        }
    }

    /// Live value for `request_id`, if any.
    pub fn get(&self, request_id: &str) -> Option<T> {
        let mut entries = self.lock();
        self.sweep(&mut entries, Instant::now());
        entries.get(request_id).map(|entry| entry.value.clone())
    }

    /// Store a value, replacing any previous entry for the id.
    pub fn insert(&self, request_id: &str, value: T) {
        let now = Instant::now();
        let mut entries = self.lock();
        self.sweep(&mut entries, now);
        entries.insert(
            request_id.to_string(),
            CacheEntry {
                created_at: now,
                value,
            },
        );
    }

    /// Return the live value for `request_id` or run `compute` and store it.
    ///
    /// The boolean is `true` when the value came from the cache. Errors are
    /// returned as-is and never cached, so a failed request can be retried.
    /// The lock is not held while `compute` runs.
    pub async fn get_or_compute<F, Fut, E>(&self, request_id: &str, compute: F) -> Result<(T, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(request_id) {
            tracing::debug!("Idempotency hit for request {request_id}");
            return Ok((value, true));
        }

        let value = compute().await?;
        self.insert(request_id, value.clone());
        Ok((value, false))
    }

    /// Number of stored entries, live or not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Request id synthesized from image content when the caller supplies none.
pub fn content_request_id(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
