//! Backing store boundary
//!
//! The proxy layer never talks to a database directly. It needs two things
//! from the persistence side: raw entities that can report their identity,
//! schema and property values ([`PersistedEntity`]), and a way to fetch a
//! fresh copy of an entity by identity ([`BackingStore`]).

pub mod memory;

use crate::error::{AccessError, Result};
use crate::schema::{EntitySchema, Identity};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub use memory::{InMemoryStore, Record, StoredValue};

/// Shared handle to a raw persisted entity
pub type EntityRef = Arc<dyn PersistedEntity>;

/// Raw property value as read from a persisted entity
#[derive(Clone)]
pub enum RawValue {
    /// No value
    Null,
    /// Plain value
    Scalar(Value),
    /// A single related entity
    Entity(EntityRef),
    /// A collection of related entities
    Entities(Vec<EntityRef>),
}

impl RawValue {
    /// Short description used in shape mismatch errors
    pub fn describe(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Scalar(_) => "scalar",
            RawValue::Entity(_) => "entity",
            RawValue::Entities(_) => "collection",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null | RawValue::Scalar(Value::Null))
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "Null"),
            RawValue::Scalar(value) => write!(f, "Scalar({})", value),
            RawValue::Entity(entity) => write!(f, "Entity({:?})", entity.identity()),
            RawValue::Entities(entities) => write!(f, "Entities(len={})", entities.len()),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            other => RawValue::Scalar(other),
        }
    }
}

/// Raw object as delivered by the backing store
pub trait PersistedEntity: Send + Sync + fmt::Debug {
    /// Stable identity, absent while the entity is not yet persisted
    fn identity(&self) -> Option<Identity>;

    /// Declared capability set of the entity type
    fn schema(&self) -> Arc<EntitySchema>;

    /// Invoke the accessor for `property`
    fn read(&self, property: &str) -> std::result::Result<RawValue, AccessError>;

    /// Ordering against another entity, `None` when the type is not comparable
    fn compare(&self, _other: &dyn PersistedEntity) -> Option<Ordering> {
        None
    }

    /// Real data behind a store-level lazy stand-in
    ///
    /// Returns `Ok(None)` when this entity already is the real data.
    fn implementation(&self) -> anyhow::Result<Option<EntityRef>> {
        Ok(None)
    }

    /// Type name from the schema
    fn entity_type(&self) -> String {
        self.schema().type_name().to_string()
    }
}

/// Fetch-by-identity access to persisted state
pub trait BackingStore: Send + Sync {
    /// Load a fresh, fully initialized copy of an entity
    fn fetch(&self, entity_type: &str, identity: Identity) -> anyhow::Result<Option<EntityRef>>;
}

/// Resolve a lazy stand-in to its real data, or return the entity unchanged
pub fn unwrap_entity(entity: EntityRef) -> Result<EntityRef> {
    match entity.implementation()? {
        Some(real) => Ok(real),
        None => Ok(entity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_value_from_json() {
        assert!(matches!(RawValue::from(Value::Null), RawValue::Null));
        assert!(matches!(RawValue::from(json!("x")), RawValue::Scalar(_)));
        assert!(RawValue::Scalar(Value::Null).is_null());
        assert_eq!(RawValue::Entities(Vec::new()).describe(), "collection");
    }
}
