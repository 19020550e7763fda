//! Session host adapter
//!
//! A [`SessionRegistry`] hands out one [`Session`] per logical session id.
//! Each session owns its own identity map and proxy factory, so sessions
//! running concurrently never share proxies.

use crate::cache::SessionCache;
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::factory::ProxyFactory;
use crate::proxy::EntityProxy;
use crate::store::{BackingStore, EntityRef};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// One logical session: an identity map plus the factory that feeds it
pub struct Session {
    cache: Arc<SessionCache>,
    factory: Arc<ProxyFactory>,
}

impl Session {
    fn open(id: Uuid, store: Arc<dyn BackingStore>, config: &ProxyConfig) -> Self {
        let cache = Arc::new(SessionCache::with_id(id, config));
        let factory = ProxyFactory::new(store, cache.clone(), config.clone());
        Self { cache, factory }
    }

    pub fn id(&self) -> Uuid {
        self.cache.id()
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.cache.opened_at()
    }

    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    pub fn factory(&self) -> &Arc<ProxyFactory> {
        &self.factory
    }

    /// Canonical proxy for `entity` within this session
    pub fn proxy(&self, entity: EntityRef) -> Result<Arc<EntityProxy>> {
        if self.cache.is_closed() {
            return Err(ProxyError::SessionClosed);
        }
        self.factory.get_proxy(entity)
    }

    pub fn is_closed(&self) -> bool {
        self.cache.is_closed()
    }

    fn close(&self) -> usize {
        self.cache.close()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("opened_at", &self.opened_at())
            .field("proxies", &self.cache.len())
            .finish()
    }
}

/// Sessions keyed by id, created on first use
pub struct SessionRegistry {
    store: Arc<dyn BackingStore>,
    config: ProxyConfig,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn BackingStore>, config: ProxyConfig) -> Self {
        Self {
            store,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Open a session under a fresh id
    pub fn open(&self) -> Arc<Session> {
        self.session(Uuid::new_v4())
    }

    /// Session for `id`, opened if it does not exist yet
    pub fn session(&self, id: Uuid) -> Arc<Session> {
        if let Some(session) = self.sessions.read().get(&id) {
            return session.clone();
        }

        self.sessions
            .write()
            .entry(id)
            .or_insert_with(|| Arc::new(Session::open(id, self.store.clone(), &self.config)))
            .clone()
    }

    /// Existing session for `id`
    pub fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions.read().get(&id).cloned()
    }

    /// Close and forget the session `id`; returns whether it existed
    pub fn close(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().remove(&id);
        match removed {
            Some(session) => {
                let dropped = session.close();
                info!("Session {} ended, {} proxies dropped", id, dropped);
                true
            }
            None => false,
        }
    }

    /// Close every session; returns how many were open
    pub fn close_all(&self) -> usize {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .write()
            .drain()
            .map(|(_, session)| session)
            .collect();

        for session in &sessions {
            session.close();
        }
        info!("Closed {} sessions", sessions.len());
        sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.sessions.read().keys().copied().collect()
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntitySchema, Identity};
    use crate::store::{InMemoryStore, Record};

    fn registry() -> (InMemoryStore, SessionRegistry) {
        let store = InMemoryStore::new();
        store.insert(Record::new(EntitySchema::new("Tag").shared(), Identity::new(1)));
        let registry = SessionRegistry::new(Arc::new(store.clone()), ProxyConfig::default());
        (store, registry)
    }

    #[test]
    fn test_session_created_lazily() {
        let (_, registry) = registry();
        let id = Uuid::new_v4();
        assert!(registry.get(id).is_none());

        let session = registry.session(id);
        assert_eq!(session.id(), id);
        assert!(Arc::ptr_eq(&session, &registry.session(id)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sessions_do_not_share_proxies() {
        let (store, registry) = registry();
        let first = registry.open();
        let second = registry.open();

        let entity = || store.snapshot("Tag", Identity::new(1)).unwrap();
        let a = first.proxy(entity()).unwrap();
        let b = second.proxy(entity()).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &first.proxy(entity()).unwrap()));
    }

    #[test]
    fn test_close_session() {
        let (store, registry) = registry();
        let session = registry.open();
        session.proxy(store.snapshot("Tag", Identity::new(1)).unwrap()).unwrap();

        assert!(registry.close(session.id()));
        assert!(!registry.close(session.id()));
        assert!(session.is_closed());
        assert!(session.cache().is_empty());
        assert!(matches!(
            session.proxy(store.snapshot("Tag", Identity::new(1)).unwrap()),
            Err(ProxyError::SessionClosed)
        ));
    }

    #[test]
    fn test_close_all() {
        let (_, registry) = registry();
        let first = registry.open();
        let second = registry.open();

        assert_eq!(registry.close_all(), 2);
        assert!(registry.is_empty());
        assert!(first.is_closed() && second.is_closed());
    }
}
