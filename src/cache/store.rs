//! Session-scoped identity map

use crate::cache::types::CacheStats;
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::proxy::EntityProxy;
use crate::schema::Identity;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Identity map owned by one logical session
///
/// Holds at most one proxy per identity. Lookups of the same identity
/// always yield the same proxy until the cache is cleared. There is no
/// expiry and no per-entry eviction: the map lives and dies with its session.
pub struct SessionCache {
    id: Uuid,
    opened_at: DateTime<Utc>,
    enable_metrics: bool,
    state: RwLock<CacheState>,
}

/// Internal map state
struct CacheState {
    proxies: HashMap<Identity, Arc<EntityProxy>>,
    stats: CacheStats,
    closed: bool,
}

impl SessionCache {
    /// Open a cache for a new session
    pub fn open(config: &ProxyConfig) -> Self {
        Self::with_id(Uuid::new_v4(), config)
    }

    /// Open a cache for the session `id`
    pub fn with_id(id: Uuid, config: &ProxyConfig) -> Self {
        info!("Opening session cache {}", id);
        Self {
            id,
            opened_at: Utc::now(),
            enable_metrics: config.enable_metrics,
            state: RwLock::new(CacheState {
                proxies: HashMap::with_capacity(config.initial_capacity),
                stats: CacheStats::default(),
                closed: false,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Look up the proxy for `identity`
    pub fn get(&self, identity: Identity) -> Option<Arc<EntityProxy>> {
        if !self.enable_metrics {
            return self.state.read().proxies.get(&identity).cloned();
        }

        let mut state = self.state.write();
        match state.proxies.get(&identity).cloned() {
            Some(proxy) => {
                state.stats.hits += 1;
                Some(proxy)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Map a proxy under its identity unless one is already mapped
    ///
    /// Returns the canonical proxy for the identity, which is the already
    /// mapped one when two threads race on the same miss.
    pub fn put(&self, proxy: Arc<EntityProxy>) -> Result<Arc<EntityProxy>> {
        let mut state = self.state.write();
        if state.closed {
            return Err(ProxyError::SessionClosed);
        }

        let identity = proxy.identity();
        if let Some(existing) = state.proxies.get(&identity) {
            debug!("Keeping existing proxy for id = {}", identity);
            return Ok(existing.clone());
        }

        state.proxies.insert(identity, proxy.clone());
        state.stats.inserts += 1;
        Ok(proxy)
    }

    pub fn contains(&self, identity: Identity) -> bool {
        self.state.read().proxies.contains_key(&identity)
    }

    pub fn len(&self) -> usize {
        self.state.read().proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().proxies.is_empty()
    }

    /// Mapped identities in ascending order
    pub fn identities(&self) -> Vec<Identity> {
        let mut identities: Vec<Identity> = self.state.read().proxies.keys().copied().collect();
        identities.sort();
        identities
    }

    /// Remove every proxy; returns how many were mapped
    pub fn clear(&self) -> usize {
        let drained: Vec<Arc<EntityProxy>> = {
            let mut state = self.state.write();
            let drained: Vec<_> = state.proxies.drain().map(|(_, proxy)| proxy).collect();
            state.stats.clears += 1;
            state.stats.invalidated += drained.len() as u64;
            drained
        };

        for proxy in &drained {
            proxy.release_relations();
        }

        info!("Cleared {} proxies from session cache {}", drained.len(), self.id);
        drained.len()
    }

    /// Clear the map and refuse further inserts
    pub fn close(&self) -> usize {
        self.state.write().closed = true;
        let count = self.clear();
        info!("Closed session cache {}", self.id);
        count
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        let mut stats = state.stats.clone();
        stats.entries = state.proxies.len();
        stats
    }
}

impl fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("SessionCache")
            .field("id", &self.id)
            .field("opened_at", &self.opened_at)
            .field("entries", &state.proxies.len())
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntitySchema;
    use crate::store::{InMemoryStore, Record};
    use std::sync::Weak;

    fn proxy(id: u64) -> Arc<EntityProxy> {
        let schema = EntitySchema::new("Tag").shared();
        let store = InMemoryStore::new();
        store.insert(Record::new(schema, Identity::new(id)));
        let entity = store.snapshot("Tag", Identity::new(id)).unwrap();
        Arc::new(EntityProxy::new(entity.as_ref(), Weak::new()).unwrap())
    }

    #[test]
    fn test_get_and_put() {
        let cache = SessionCache::open(&ProxyConfig::default());
        assert!(cache.get(Identity::new(1)).is_none());

        let first = cache.put(proxy(1)).unwrap();
        let found = cache.get(Identity::new(1)).unwrap();
        assert!(Arc::ptr_eq(&first, &found));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_put_keeps_first_proxy() {
        let cache = SessionCache::open(&ProxyConfig::default());
        let first = cache.put(proxy(7)).unwrap();
        let second = cache.put(proxy(7)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().inserts, 1);
    }

    #[test]
    fn test_clear() {
        let cache = SessionCache::open(&ProxyConfig::default());
        cache.put(proxy(1)).unwrap();
        cache.put(proxy(2)).unwrap();
        assert_eq!(cache.identities(), vec![Identity::new(1), Identity::new(2)]);

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert!(!cache.contains(Identity::new(1)));

        let stats = cache.stats();
        assert_eq!(stats.clears, 1);
        assert_eq!(stats.invalidated, 2);

        // Still usable after a clear
        cache.put(proxy(1)).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_closed_cache_rejects_puts() {
        let cache = SessionCache::open(&ProxyConfig::default());
        cache.put(proxy(1)).unwrap();

        assert_eq!(cache.close(), 1);
        assert!(cache.is_closed());
        assert!(matches!(cache.put(proxy(2)), Err(ProxyError::SessionClosed)));
    }

    #[test]
    fn test_metrics_disabled() {
        let config = ProxyConfig::builder().enable_metrics(false).build();
        let cache = SessionCache::open(&config);
        cache.put(proxy(1)).unwrap();
        cache.get(Identity::new(1));
        cache.get(Identity::new(2));

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
    }
}
