//! TTL cache with a singleflight guarantee.
//!
//! The first caller for a missing key computes; concurrent callers for the
//! same key await that in-flight computation instead of duplicating it.
//! Distinct keys never contend beyond the brief map locks. A leader whose
//! future is dropped mid-compute releases the key; its followers wake and
//! recompute.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

pub struct SingleflightCache<V: Clone + Send + 'static> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    // Sync mutex so the leader guard can deregister in Drop; only ever held
    // for a map lookup, never across an await.
    inflight: std::sync::Mutex<HashMap<String, broadcast::Sender<V>>>,
}

struct Entry<V> {
    stored_at: DateTime<Utc>,
    ttl: Duration,
    value: V,
}

impl<V> Entry<V> {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.stored_at).to_std().map(|age| age >= self.ttl).unwrap_or(true)
    }
}

impl<V: Clone + Send + 'static> SingleflightCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            inflight: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Lazy wall-clock expiry: stale entries are evicted on read.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if !entry.expired(Utc::now()) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Last-write-wins: a later put for the same key overwrites.
    pub async fn put(&self, key: &str, value: V, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                stored_at: Utc::now(),
                ttl,
                value,
            },
        );
    }

    /// Cache-or-compute with the singleflight guarantee.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        self.get_or_compute_with(key, move || {
            let fut = compute();
            async move { (fut.await, Some(ttl)) }
        })
        .await
    }

    /// Like `get_or_compute`, but the computation decides whether its result
    /// is worth storing (`None` broadcasts to waiters without caching, so a
    /// degraded result isn't pinned for a TTL).
    pub async fn get_or_compute_with<F, Fut>(&self, key: &str, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = (V, Option<Duration>)>,
    {
        if let Some(value) = self.get(key).await {
            return value;
        }

        // Join an in-flight computation if one exists, otherwise become the
        // leader by registering a channel for followers.
        let rx = {
            let mut inflight = self.inflight.lock().expect("inflight lock poisoned");
            match inflight.get(key) {
                Some(tx) => Some(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    inflight.insert(key.to_string(), tx);
                    None
                }
            }
        };

        if let Some(mut rx) = rx {
            if let Ok(value) = rx.recv().await {
                return value;
            }
            // The leader's guard dropped without broadcasting (cancelled
            // mid-compute). Check the cache once, then compute ourselves
            // without re-registering.
            if let Some(value) = self.get(key).await {
                return value;
            }
            debug!(key, "Singleflight leader vanished, recomputing");
            let (value, store_ttl) = compute().await;
            if let Some(ttl) = store_ttl {
                self.put(key, value.clone(), ttl).await;
            }
            return value;
        }

        // Deregistration rides on this guard rather than on reaching the
        // end of the function, so a leader cancelled mid-compute still
        // releases the key and wakes its followers.
        let guard = LeaderGuard {
            inflight: &self.inflight,
            key,
            completed: false,
        };
        let (value, store_ttl) = compute().await;
        if let Some(ttl) = store_ttl {
            self.put(key, value.clone(), ttl).await;
        }
        guard.broadcast(&value);
        value
    }

    /// Optional background sweep for memory bounding; expiry itself doesn't
    /// need it since reads evict lazily.
    pub fn spawn_sweep_loop(self: &Arc<Self>, interval: Duration) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut entries = cache.entries.lock().await;
                let before = entries.len();
                let now = Utc::now();
                entries.retain(|_, entry| !entry.expired(now));
                if entries.len() < before {
                    debug!(evicted = before - entries.len(), "Cache sweep");
                }
            }
        });
    }
}

impl<V: Clone + Send + 'static> Default for SingleflightCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the leader's inflight registration exactly once: on `broadcast`
/// after a completed computation, or in `Drop` when the leader's future is
/// cancelled. Dropping the sender without broadcasting closes the channel,
/// which is what wakes the followers into their recompute path.
struct LeaderGuard<'a, V: Clone + Send + 'static> {
    inflight: &'a std::sync::Mutex<HashMap<String, broadcast::Sender<V>>>,
    key: &'a str,
    completed: bool,
}

impl<V: Clone + Send + 'static> LeaderGuard<'_, V> {
    fn broadcast(mut self, value: &V) {
        let tx = self
            .inflight
            .lock()
            .expect("inflight lock poisoned")
            .remove(self.key);
        if let Some(tx) = tx {
            let _ = tx.send(value.clone());
        }
        self.completed = true;
    }
}

impl<V: Clone + Send + 'static> Drop for LeaderGuard<'_, V> {
    fn drop(&mut self) {
        if !self.completed {
            self.inflight
                .lock()
                .expect("inflight lock poisoned")
                .remove(self.key);
        }
    }
}
