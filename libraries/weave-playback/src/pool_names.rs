//! Pool display-name cache
//!
//! Names are looked up on every draw, so resolved names are kept for a while.
//! Failed lookups are not cached.

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use tracing::warn;
use weave_core::types::UNKNOWN_POOL_NAME;
use weave_core::{ContentProvider, PoolId};

struct Entry {
    name: String,
    expires_at: DateTime<Utc>,
}

/// LRU cache of pool names with a fixed time to live
pub struct PoolNameCache {
    entries: Mutex<LruCache<PoolId, Entry>>,
    ttl: Duration,
}

impl PoolNameCache {
    /// Create a cache holding up to `capacity` names (at least one)
    pub fn new(capacity: usize, ttl: std::time::Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::zero()),
        }
    }

    /// Cached name, if present and fresh at `now`
    pub fn get(&self, pool_id: &PoolId, now: DateTime<Utc>) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = entries
            .get(pool_id)
            .map(|entry| (entry.expires_at > now).then(|| entry.name.clone()));

        match fresh {
            Some(Some(name)) => Some(name),
            Some(None) => {
                entries.pop(pool_id);
                None
            }
            None => None,
        }
    }

    /// Remember a name resolved at `now`
    pub fn insert(&self, pool_id: PoolId, name: String, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put(
            pool_id,
            Entry {
                name,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drop every cached name
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Resolve a name through the cache, falling back to the placeholder
    pub async fn resolve(
        &self,
        provider: &dyn ContentProvider,
        pool_id: &PoolId,
        now: DateTime<Utc>,
    ) -> String {
        if let Some(name) = self.get(pool_id, now) {
            return name;
        }

        match provider.pool_name(pool_id).await {
            Ok(name) => {
                self.insert(pool_id.clone(), name.clone(), now);
                name
            }
            Err(e) => {
                warn!(pool = %pool_id, error = %e, "Pool name lookup failed");
                UNKNOWN_POOL_NAME.to_string()
            }
        }
    }
}
