use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crisiswatch_common::SourceSignal;

/// Per-provider response cache with lazy wall-clock expiry.
///
/// Exists to respect upstream rate limits, not to serve the orchestration
/// layer (that's the assessment cache's job). Only successful signals are
/// stored; a failing provider is retried on the next fetch rather than
/// having its outage pinned for a TTL.
pub struct ProviderCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedSignal>>,
}

struct CachedSignal {
    stored_at: DateTime<Utc>,
    signal: SourceSignal,
}

impl ProviderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, country: &str) -> Option<SourceSignal> {
        let key = country.to_lowercase();
        let mut entries = self.entries.lock().await;
        match entries.get(&key) {
            Some(cached) if !self.expired(cached) => Some(cached.signal.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, country: &str, signal: SourceSignal) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            country.to_lowercase(),
            CachedSignal {
                stored_at: Utc::now(),
                signal,
            },
        );
    }

    fn expired(&self, cached: &CachedSignal) -> bool {
        let age = Utc::now() - cached.stored_at;
        age.to_std().map(|a| a >= self.ttl).unwrap_or(true)
    }
}
