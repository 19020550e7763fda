//! In-memory backing store
//!
//! Records are kept per entity type and identity. Relation values are stored
//! as identities and materialized into fresh snapshots whenever they are read,
//! so every fetch observes the current state of the store. The store counts
//! fetches, which makes lazy-loading behavior observable in tests.

use crate::error::AccessError;
use crate::schema::{EntitySchema, Identity};
use crate::store::{BackingStore, EntityRef, PersistedEntity, RawValue};
use anyhow::anyhow;
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::debug;

/// Scalar property every record carries
pub const IDENTITY_PROPERTY: &str = "Identity";

/// Stored form of one property value
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// Plain value
    Scalar(Value),
    /// Reference to one entity
    Ref {
        entity_type: String,
        identity: Identity,
    },
    /// References to several entities, in stored order
    Refs {
        entity_type: String,
        identities: Vec<Identity>,
    },
    /// Accessor that fails when invoked
    Unreadable(String),
}

/// Stored state of one entity
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<EntitySchema>,
    identity: Identity,
    values: HashMap<String, StoredValue>,
    order_by: Option<String>,
}

impl Record {
    /// Create a record; the `Identity` scalar is filled in automatically
    pub fn new(schema: Arc<EntitySchema>, identity: Identity) -> Self {
        let mut values = HashMap::new();
        values.insert(
            IDENTITY_PROPERTY.to_string(),
            StoredValue::Scalar(Value::from(identity.raw())),
        );
        Self {
            schema,
            identity,
            values,
            order_by: None,
        }
    }

    pub fn with_scalar(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, StoredValue::Scalar(value.into()));
        self
    }

    pub fn with_ref(
        mut self,
        name: impl Into<String>,
        entity_type: impl Into<String>,
        identity: Identity,
    ) -> Self {
        self.set(
            name,
            StoredValue::Ref {
                entity_type: entity_type.into(),
                identity,
            },
        );
        self
    }

    pub fn with_refs(
        mut self,
        name: impl Into<String>,
        entity_type: impl Into<String>,
        identities: impl IntoIterator<Item = Identity>,
    ) -> Self {
        self.set(
            name,
            StoredValue::Refs {
                entity_type: entity_type.into(),
                identities: identities.into_iter().collect(),
            },
        );
        self
    }

    /// Make the accessor for `name` fail with `reason`
    pub fn with_unreadable(mut self, name: impl Into<String>, reason: impl Into<String>) -> Self {
        self.set(name, StoredValue::Unreadable(reason.into()));
        self
    }

    /// Order entities of this record by a scalar property
    pub fn ordered_by(mut self, name: impl Into<String>) -> Self {
        self.order_by = Some(name.into());
        self
    }

    /// Replace one stored value
    pub fn set(&mut self, name: impl Into<String>, value: StoredValue) {
        self.values.insert(name.into(), value);
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn entity_type(&self) -> &str {
        self.schema.type_name()
    }

    pub fn value(&self, name: &str) -> Option<&StoredValue> {
        self.values.get(name)
    }
}

type RecordKey = (String, Identity);

/// Thread-safe in-memory store, cheap to clone
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<RecordKey, Record>>>,
    fetches: Arc<AtomicU64>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record
    pub fn insert(&self, record: Record) {
        let key = (record.entity_type().to_string(), record.identity());
        self.records.write().insert(key, record);
    }

    /// Mutate a stored record in place; returns false when it does not exist
    pub fn update<F>(&self, entity_type: &str, identity: Identity, f: F) -> bool
    where
        F: FnOnce(&mut Record),
    {
        let mut records = self.records.write();
        match records.get_mut(&(entity_type.to_string(), identity)) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Delete a record; returns false when it does not exist
    pub fn remove(&self, entity_type: &str, identity: Identity) -> bool {
        self.records
            .write()
            .remove(&(entity_type.to_string(), identity))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Current state of a record as a raw entity, without counting a fetch
    pub fn snapshot(&self, entity_type: &str, identity: Identity) -> Option<EntityRef> {
        let record = self
            .records
            .read()
            .get(&(entity_type.to_string(), identity))
            .cloned()?;
        Some(Arc::new(StoredEntity {
            record,
            store: self.clone(),
        }))
    }

    /// Lazy stand-in for a stored record, resolved on first use
    pub fn stand_in(&self, entity_type: &str, identity: Identity) -> Option<EntityRef> {
        let schema = self
            .records
            .read()
            .get(&(entity_type.to_string(), identity))
            .map(|record| record.schema.clone())?;
        Some(Arc::new(StandIn {
            entity_type: entity_type.to_string(),
            identity,
            schema,
            store: self.clone(),
        }))
    }

    /// Number of fetches served through [`BackingStore::fetch`]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(AtomicOrdering::SeqCst)
    }

    pub fn reset_fetch_count(&self) {
        self.fetches.store(0, AtomicOrdering::SeqCst);
    }
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("records", &self.len())
            .field("fetches", &self.fetch_count())
            .finish()
    }
}

impl BackingStore for InMemoryStore {
    fn fetch(&self, entity_type: &str, identity: Identity) -> anyhow::Result<Option<EntityRef>> {
        self.fetches.fetch_add(1, AtomicOrdering::SeqCst);
        let entity = self.snapshot(entity_type, identity);
        if entity.is_none() {
            debug!("No stored {} with id = {}", entity_type, identity);
        }
        Ok(entity)
    }
}

/// Snapshot of a record at the time it was fetched
struct StoredEntity {
    record: Record,
    store: InMemoryStore,
}

impl fmt::Debug for StoredEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoredEntity({}#{})", self.record.entity_type(), self.record.identity)
    }
}

impl PersistedEntity for StoredEntity {
    fn identity(&self) -> Option<Identity> {
        Some(self.record.identity)
    }

    fn schema(&self) -> Arc<EntitySchema> {
        self.record.schema.clone()
    }

    fn read(&self, property: &str) -> Result<RawValue, AccessError> {
        match self.record.values.get(property) {
            Some(StoredValue::Scalar(value)) => Ok(RawValue::from(value.clone())),
            Some(StoredValue::Ref {
                entity_type,
                identity,
            }) => Ok(self
                .store
                .snapshot(entity_type, *identity)
                .map(RawValue::Entity)
                .unwrap_or(RawValue::Null)),
            Some(StoredValue::Refs {
                entity_type,
                identities,
            }) => Ok(RawValue::Entities(
                identities
                    .iter()
                    .filter_map(|identity| self.store.snapshot(entity_type, *identity))
                    .collect(),
            )),
            Some(StoredValue::Unreadable(reason)) => Err(AccessError::Invocation {
                property: property.to_string(),
                reason: reason.clone(),
            }),
            None if self.record.schema.descriptor(property).is_some() => Ok(RawValue::Null),
            None => Err(AccessError::NoSuchAccessor {
                property: property.to_string(),
            }),
        }
    }

    fn compare(&self, other: &dyn PersistedEntity) -> Option<Ordering> {
        let key = self.record.order_by.as_deref()?;
        let mine = self.read(key).ok()?;
        let theirs = other.read(key).ok()?;
        compare_scalars(&mine, &theirs)
    }
}

/// Unloaded reference to a stored record
struct StandIn {
    entity_type: String,
    identity: Identity,
    schema: Arc<EntitySchema>,
    store: InMemoryStore,
}

impl StandIn {
    fn load(&self) -> anyhow::Result<EntityRef> {
        self.store
            .snapshot(&self.entity_type, self.identity)
            .ok_or_else(|| anyhow!("dangling stand-in {}#{}", self.entity_type, self.identity))
    }
}

impl fmt::Debug for StandIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StandIn({}#{})", self.entity_type, self.identity)
    }
}

impl PersistedEntity for StandIn {
    fn identity(&self) -> Option<Identity> {
        Some(self.identity)
    }

    fn schema(&self) -> Arc<EntitySchema> {
        self.schema.clone()
    }

    fn read(&self, property: &str) -> Result<RawValue, AccessError> {
        let entity = self.load().map_err(|e| AccessError::Invocation {
            property: property.to_string(),
            reason: e.to_string(),
        })?;
        entity.read(property)
    }

    fn compare(&self, other: &dyn PersistedEntity) -> Option<Ordering> {
        self.load().ok()?.compare(other)
    }

    fn implementation(&self) -> anyhow::Result<Option<EntityRef>> {
        self.load().map(Some)
    }
}

fn compare_scalars(left: &RawValue, right: &RawValue) -> Option<Ordering> {
    match (left, right) {
        (RawValue::Null, RawValue::Null) => Some(Ordering::Equal),
        (RawValue::Null, _) => Some(Ordering::Less),
        (_, RawValue::Null) => Some(Ordering::Greater),
        (RawValue::Scalar(Value::Number(a)), RawValue::Scalar(Value::Number(b))) => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (RawValue::Scalar(Value::String(a)), RawValue::Scalar(Value::String(b))) => Some(a.cmp(b)),
        (RawValue::Scalar(Value::Bool(a)), RawValue::Scalar(Value::Bool(b))) => Some(a.cmp(b)),
        _ => None,
    }
}
