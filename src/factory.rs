//! Proxy factory
//!
//! The only place where entity proxies are created and where the session
//! identity map is consulted or updated.

use crate::cache::{CacheStats, SessionCache};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::proxy::{EntityProxy, PropertyValue, ProxyCollection};
use crate::schema::{CollectionShape, Identity, PropertyDescriptor, PropertyKind};
use crate::store::{unwrap_entity, BackingStore, EntityRef, RawValue};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Creates, canonicalizes and merges entity proxies for one session
pub struct ProxyFactory {
    this: Weak<ProxyFactory>,
    store: Arc<dyn BackingStore>,
    cache: Option<Arc<SessionCache>>,
    config: ProxyConfig,
}

impl ProxyFactory {
    /// Factory backed by a session identity map
    pub fn new(
        store: Arc<dyn BackingStore>,
        cache: Arc<SessionCache>,
        config: ProxyConfig,
    ) -> Arc<Self> {
        Self::build(store, Some(cache), config)
    }

    /// Factory without an identity map
    ///
    /// Every `get_proxy` builds a fresh proxy and `merge` never finds one.
    pub fn without_cache(store: Arc<dyn BackingStore>, config: ProxyConfig) -> Arc<Self> {
        Self::build(store, None, config)
    }

    fn build(
        store: Arc<dyn BackingStore>,
        cache: Option<Arc<SessionCache>>,
        config: ProxyConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            store,
            cache,
            config,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Arc<SessionCache>> {
        self.cache.as_ref()
    }

    /// Identity map statistics, default when running without a cache
    pub fn stats(&self) -> CacheStats {
        self.cache
            .as_ref()
            .map(|cache| cache.stats())
            .unwrap_or_default()
    }

    /// Canonical proxy for `entity`
    ///
    /// On a hit the mapped proxy is returned unchanged and the data carried
    /// by `entity` is ignored; use [`ProxyFactory::merge`] to apply it.
    pub fn get_proxy(&self, entity: EntityRef) -> Result<Arc<EntityProxy>> {
        let identity = identity_of(&entity)?;

        if let Some(cache) = &self.cache {
            if let Some(proxy) = cache.get(identity) {
                debug!("Proxy hit for {} with id = {}", entity.entity_type(), identity);
                return Ok(proxy);
            }
        }

        debug!("Proxy miss for {} with id = {}", entity.entity_type(), identity);
        let entity = unwrap_entity(entity)?;
        let proxy = Arc::new(EntityProxy::new(entity.as_ref(), self.this.clone())?);

        match &self.cache {
            Some(cache) => cache.put(proxy),
            None => Ok(proxy),
        }
    }

    /// Proxies for `entities`, collected into the requested shape
    pub fn get_proxies(
        &self,
        entities: Vec<EntityRef>,
        shape: CollectionShape,
    ) -> Result<ProxyCollection> {
        let mut proxies = ProxyCollection::with_capacity(shape, entities.len());
        for entity in entities {
            proxies.push(self.get_proxy(entity)?);
        }
        Ok(proxies)
    }

    /// Refresh the scalars of the mapped proxy for `entity`
    ///
    /// Returns whether a proxy was mapped.
    pub fn merge(&self, entity: EntityRef) -> Result<bool> {
        match self.mapped(&entity)? {
            Some(proxy) => {
                let entity = unwrap_entity(entity)?;
                proxy.merge(entity.as_ref())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Refresh scalars and relations of the mapped proxy for `entity`
    pub fn merge_full(&self, entity: EntityRef) -> Result<bool> {
        match self.mapped(&entity)? {
            Some(proxy) => {
                let entity = unwrap_entity(entity)?;
                proxy.merge_full(entity.as_ref())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Merge into the mapped proxy if there is one, then return the canonical proxy
    pub fn merge_or_create(&self, entity: EntityRef) -> Result<Arc<EntityProxy>> {
        self.merge(entity.clone())?;
        self.get_proxy(entity)
    }

    /// Empty the identity map; returns how many proxies were dropped
    pub fn clear(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.clear(),
            None => {
                info!("Proxy factory has no session cache to clear");
                0
            }
        }
    }

    /// Fresh copy of an entity from the backing store, stand-ins resolved
    pub(crate) fn fetch(&self, entity_type: &str, identity: Identity) -> Result<Option<EntityRef>> {
        debug!("Find {} with id = {}", entity_type, identity);
        self.store
            .fetch(entity_type, identity)?
            .map(unwrap_entity)
            .transpose()
    }

    /// Wrap a raw relation value according to its declared kind
    pub(crate) fn wrap_related(
        &self,
        descriptor: &PropertyDescriptor,
        raw: RawValue,
    ) -> Result<PropertyValue> {
        if raw.is_null() {
            return Ok(PropertyValue::Null);
        }

        match (descriptor.kind, raw) {
            (PropertyKind::Scalar, RawValue::Scalar(value)) => Ok(PropertyValue::Scalar(value)),
            (PropertyKind::Entity, RawValue::Entity(entity)) => {
                Ok(PropertyValue::Entity(self.get_proxy(entity)?))
            }
            (PropertyKind::Collection(shape), RawValue::Entities(entities)) => {
                Ok(PropertyValue::Collection(self.get_proxies(entities, shape)?))
            }
            (kind, raw) => Err(ProxyError::ShapeMismatch {
                property: descriptor.name.clone(),
                expected: kind.describe().to_string(),
                found: raw.describe().to_string(),
            }),
        }
    }

    fn mapped(&self, entity: &EntityRef) -> Result<Option<Arc<EntityProxy>>> {
        let identity = identity_of(entity)?;
        Ok(self.cache.as_ref().and_then(|cache| cache.get(identity)))
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

fn identity_of(entity: &EntityRef) -> Result<Identity> {
    entity.identity().ok_or_else(|| ProxyError::MissingIdentity {
        entity_type: entity.entity_type(),
    })
}
