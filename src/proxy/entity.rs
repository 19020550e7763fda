//! Entity proxy with lazy relation resolution
//!
//! Scalar properties are copied into the property bag when the proxy is
//! built. Relation properties stay unresolved until first read: the owning
//! entity is then fetched fresh by identity, the requested relation is read
//! from that snapshot, wrapped through the factory and cached in the bag.

use crate::config::MissingEntityPolicy;
use crate::error::{AccessError, ProxyError, Result};
use crate::factory::ProxyFactory;
use crate::proxy::call::{Argument, Call, Intercept, ProxyHandle, Reply};
use crate::proxy::intrinsics::{Intrinsic, ObjectIntrinsics};
use crate::proxy::property::{Property, PropertyType};
use crate::proxy::value::{PropertyStore, PropertyValue};
use crate::schema::{EntitySchema, Identity, PropertyDescriptor};
use crate::store::{unwrap_entity, EntityRef, PersistedEntity, RawValue};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

/// Outcome of resolving one property
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Nothing is known for the property
    Absent,
    /// The accessor failed; the bag holds null for it
    Failed(AccessError),
    /// Property value, possibly null
    Present(PropertyValue),
}

impl Resolution {
    /// Collapse to a plain value: absence and failure both read as null
    pub fn into_value(self) -> PropertyValue {
        match self {
            Resolution::Present(value) => value,
            Resolution::Absent | Resolution::Failed(_) => PropertyValue::Null,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Resolution::Present(_))
    }
}

/// Right-hand side of an ordering comparison
#[derive(Debug, Clone)]
pub enum Comparand {
    Proxy(Arc<EntityProxy>),
    Entity(EntityRef),
}

/// Proxy for one persisted entity
pub struct EntityProxy {
    identity: Identity,
    schema: Arc<EntitySchema>,
    store: PropertyStore,
    failures: RwLock<HashMap<String, AccessError>>,
    factory: Weak<ProxyFactory>,
}

impl EntityProxy {
    /// Build a proxy and copy every scalar property of `entity` into it
    pub fn new(entity: &dyn PersistedEntity, factory: Weak<ProxyFactory>) -> Result<Self> {
        let schema = entity.schema();
        let identity = entity
            .identity()
            .ok_or_else(|| ProxyError::MissingIdentity {
                entity_type: schema.type_name().to_string(),
            })?;

        let hash = proxy_hash(schema.type_name(), identity);
        let proxy = Self {
            identity,
            store: PropertyStore::new(ObjectIntrinsics::new(
                "EntityProxy",
                schema.type_name(),
                hash,
            )),
            schema,
            failures: RwLock::new(HashMap::new()),
            factory,
        };
        proxy.fill_properties(entity, false)?;
        Ok(proxy)
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    pub fn entity_type(&self) -> &str {
        self.schema.type_name()
    }

    /// Whether the property is present in the bag
    pub fn contains(&self, property: &str) -> bool {
        self.store.contains(property)
    }

    /// Names of the properties loaded so far
    pub fn loaded_properties(&self) -> Vec<String> {
        self.store.names()
    }

    /// Write a bag value directly
    pub fn set(&self, property: impl Into<String>, value: PropertyValue) {
        let property = property.into();
        self.failures.write().remove(&property);
        self.store.set(property, value);
    }

    /// Read a property, resolving relations on first access
    ///
    /// Absence and accessor failure both read as [`PropertyValue::Null`]; use
    /// [`EntityProxy::resolve`] to tell them apart.
    pub fn get(&self, property: &str) -> Result<PropertyValue> {
        Ok(self.resolve(property)?.into_value())
    }

    /// Read a property and report how it was resolved
    pub fn resolve(&self, property: &str) -> Result<Resolution> {
        if let Some(failure) = self.failures.read().get(property) {
            return Ok(Resolution::Failed(failure.clone()));
        }
        if let Some(value) = self.store.get(property) {
            return Ok(Resolution::Present(value));
        }

        let descriptor = self.descriptor(property)?.clone();
        if !descriptor.is_relation() {
            return Ok(Resolution::Absent);
        }
        self.resolve_relation(&descriptor)
    }

    fn resolve_relation(&self, descriptor: &PropertyDescriptor) -> Result<Resolution> {
        let factory = self.factory()?;
        debug!(
            "Resolving {} of {} with id = {}",
            descriptor.name,
            self.entity_type(),
            self.identity
        );

        let fresh = match factory.fetch(self.entity_type(), self.identity)? {
            Some(entity) => entity,
            None => match factory.config().missing_entity_policy {
                MissingEntityPolicy::Error => return Err(self.not_found()),
                MissingEntityPolicy::Null => {
                    warn!(
                        "{} with id = {} vanished from the store, {} reads as null",
                        self.entity_type(),
                        self.identity,
                        descriptor.name
                    );
                    return Ok(Resolution::Absent);
                }
            },
        };

        match fresh.read(&descriptor.name) {
            Ok(raw) => {
                let value = factory.wrap_related(descriptor, raw)?;
                let stored = self.store.insert_if_absent(&descriptor.name, value);
                Ok(Resolution::Present(stored))
            }
            Err(failure) => {
                error!(
                    "Cannot read {} of {} with id = {}: {}",
                    descriptor.name,
                    self.entity_type(),
                    self.identity,
                    failure
                );
                self.record_failure(&descriptor.name, failure.clone());
                Ok(Resolution::Failed(failure))
            }
        }
    }

    /// Order this entity against `other` using current store state
    pub fn compare_to(&self, other: &Comparand) -> Result<Ordering> {
        let factory = self.factory()?;
        let mine = factory
            .fetch(self.entity_type(), self.identity)?
            .ok_or_else(|| self.not_found())?;

        let theirs = match other {
            Comparand::Proxy(proxy) => factory
                .fetch(proxy.entity_type(), proxy.identity())?
                .ok_or_else(|| proxy.not_found())?,
            Comparand::Entity(entity) => unwrap_entity(entity.clone())?,
        };

        mine.compare(theirs.as_ref())
            .ok_or_else(|| ProxyError::NotComparable {
                entity_type: self.entity_type().to_string(),
            })
    }

    /// Refresh scalar properties from `entity`; cached relations are kept
    pub fn merge(&self, entity: &dyn PersistedEntity) -> Result<()> {
        self.check_identity(entity)?;
        self.fill_properties(entity, false)
    }

    /// Refresh scalars and re-wrap every relation from `entity`
    pub fn merge_full(&self, entity: &dyn PersistedEntity) -> Result<()> {
        self.check_identity(entity)?;
        self.fill_properties(entity, true)
    }

    /// Loaded state as JSON, relations rendered as identities
    pub fn snapshot(&self) -> Value {
        let mut properties = Map::new();
        for (name, value) in self.store.entries() {
            properties.insert(name, value.to_json());
        }
        json!({
            "type": self.entity_type(),
            "identity": self.identity,
            "properties": properties,
        })
    }

    /// Drop resolved relation values so they resolve lazily again
    ///
    /// Related proxies reference each other through their bags; releasing
    /// relations when a session cache is cleared breaks those cycles.
    /// Recorded accessor failures for those relations are forgotten too.
    pub(crate) fn release_relations(&self) -> usize {
        let mut failures = self.failures.write();
        self.schema
            .relation_properties()
            .filter(|descriptor| {
                failures.remove(&descriptor.name);
                self.store.remove(&descriptor.name).is_some()
            })
            .count()
    }

    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    fn fill_properties(&self, entity: &dyn PersistedEntity, include_entities: bool) -> Result<()> {
        let factory = if include_entities {
            Some(self.factory()?)
        } else {
            None
        };

        let mut loaded = Vec::new();
        let mut failed = Vec::new();
        for descriptor in self.schema.descriptors() {
            if descriptor.is_relation() && factory.is_none() {
                continue;
            }
            let raw = match entity.read(&descriptor.name) {
                Ok(raw) => raw,
                Err(failure) => {
                    error!(
                        "Cannot read {} of {} with id = {}: {}",
                        descriptor.name,
                        self.entity_type(),
                        self.identity,
                        failure
                    );
                    failed.push((descriptor.name.clone(), failure));
                    continue;
                }
            };
            let value = match &factory {
                Some(factory) if descriptor.is_relation() => factory.wrap_related(descriptor, raw)?,
                _ => scalar_value(descriptor, raw)?,
            };
            loaded.push((descriptor.name.clone(), value));
        }

        {
            let mut failures = self.failures.write();
            for (name, _) in &loaded {
                failures.remove(name);
            }
        }
        self.store.set_all(loaded);
        for (name, failure) in failed {
            self.record_failure(&name, failure);
        }
        Ok(())
    }

    fn record_failure(&self, property: &str, failure: AccessError) {
        self.failures.write().insert(property.to_string(), failure);
        self.store.set(property, PropertyValue::Null);
    }

    fn check_identity(&self, entity: &dyn PersistedEntity) -> Result<()> {
        match entity.identity() {
            Some(identity) if identity == self.identity => Ok(()),
            other => Err(ProxyError::IdentityMismatch {
                expected: self.identity,
                found: other
                    .map(|identity| identity.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            }),
        }
    }

    fn descriptor(&self, property: &str) -> Result<&PropertyDescriptor> {
        self.schema
            .descriptor(property)
            .ok_or_else(|| ProxyError::UnknownProperty {
                entity_type: self.entity_type().to_string(),
                property: property.to_string(),
            })
    }

    fn factory(&self) -> Result<Arc<ProxyFactory>> {
        self.factory.upgrade().ok_or(ProxyError::FactoryDropped)
    }

    fn not_found(&self) -> ProxyError {
        ProxyError::EntityNotFound {
            entity_type: self.entity_type().to_string(),
            identity: self.identity,
        }
    }

    fn comparand(argument: &Argument) -> Result<Comparand> {
        match argument {
            Argument::Proxy(ProxyHandle::Entity(proxy)) => Ok(Comparand::Proxy(proxy.clone())),
            Argument::Entity(entity) => Ok(Comparand::Entity(entity.clone())),
            other => Err(ProxyError::InvalidArgument(format!(
                "cannot compare an entity with {:?}",
                other
            ))),
        }
    }
}

impl Intercept for EntityProxy {
    fn handles(&self, call: &Call) -> bool {
        self.store.handles(call)
    }

    fn invoke(&self, call: &Call) -> Result<Reply> {
        if let Some(intrinsic) = Intrinsic::recognize(call.name(), call.arity()) {
            let receiver = self as *const Self as *const ();
            return self.store.intrinsics().answer(receiver, intrinsic, call.args());
        }

        let property = Property::classify_entity(call.name(), call.arity());
        match property.kind() {
            PropertyType::Get => Ok(Reply::Value(self.get(property.name())?)),
            PropertyType::Set => {
                let unresolved_relation = !self.store.contains(property.name())
                    && self
                        .schema
                        .descriptor(property.name())
                        .map(PropertyDescriptor::is_relation)
                        .unwrap_or(false);
                if unresolved_relation {
                    debug!(
                        "Ignoring {} on unresolved relation of {} with id = {}",
                        call.name(),
                        self.entity_type(),
                        self.identity
                    );
                    return Ok(Reply::Void);
                }
                let value = PropertyValue::from_argument(call.first_arg()?)?;
                self.set(property.name(), value);
                Ok(Reply::Void)
            }
            PropertyType::Comparable => {
                let comparand = Self::comparand(call.first_arg()?)?;
                Ok(Reply::Ordering(self.compare_to(&comparand)?))
            }
            PropertyType::Undefined => {
                debug!("Unhandled call {} on {:?}", call.name(), self);
                Ok(Reply::Void)
            }
        }
    }
}

impl fmt::Debug for EntityProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityProxy")
            .field("type", &self.entity_type())
            .field("identity", &self.identity)
            .field("loaded", &self.store.names())
            .finish()
    }
}

fn proxy_hash(type_name: &str, identity: Identity) -> u64 {
    let mut hasher = DefaultHasher::new();
    type_name.hash(&mut hasher);
    identity.raw().hash(&mut hasher);
    hasher.finish()
}

/// Bag value for a scalar descriptor
fn scalar_value(descriptor: &PropertyDescriptor, raw: RawValue) -> Result<PropertyValue> {
    match raw {
        RawValue::Null => Ok(PropertyValue::Null),
        RawValue::Scalar(value) => Ok(PropertyValue::from(value)),
        other => Err(ProxyError::ShapeMismatch {
            property: descriptor.name.clone(),
            expected: descriptor.kind.describe().to_string(),
            found: other.describe().to_string(),
        }),
    }
}
