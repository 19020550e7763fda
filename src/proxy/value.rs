//! Property bag overlay
//!
//! [`PropertyStore`] maps property names to values for one proxy and answers
//! accessor calls from that map. [`ValueProxy`] is the plain form: a proxy for
//! a non-persisted value type whose state lives entirely in the bag.

use crate::error::{ProxyError, Result};
use crate::proxy::call::{Argument, Call, Intercept, ProxyHandle, Reply};
use crate::proxy::entity::EntityProxy;
use crate::proxy::intrinsics::{Intrinsic, ObjectIntrinsics};
use crate::proxy::property::{Property, PropertyType};
use crate::schema::{CollectionShape, Identity};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Proxies of a collection relation, shaped by its declared collection family
#[derive(Debug, Clone)]
pub struct ProxyCollection {
    shape: CollectionShape,
    items: Vec<Arc<EntityProxy>>,
    members: HashSet<usize>,
}

impl ProxyCollection {
    pub fn new(shape: CollectionShape) -> Self {
        Self::with_capacity(shape, 0)
    }

    pub fn with_capacity(shape: CollectionShape, capacity: usize) -> Self {
        Self {
            shape,
            items: Vec::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    /// Add a proxy; returns false when a set already holds that instance
    pub fn push(&mut self, proxy: Arc<EntityProxy>) -> bool {
        let fresh = self.members.insert(address(&proxy));
        match self.shape {
            CollectionShape::List => {
                self.items.push(proxy);
                true
            }
            CollectionShape::Set => {
                if fresh {
                    self.items.push(proxy);
                }
                fresh
            }
            CollectionShape::SortedSet => {
                if !fresh {
                    return false;
                }
                let at = self
                    .items
                    .partition_point(|item| item.identity() <= proxy.identity());
                self.items.insert(at, proxy);
                true
            }
        }
    }

    /// Membership by proxy instance
    pub fn contains(&self, proxy: &Arc<EntityProxy>) -> bool {
        self.members.contains(&address(proxy))
    }

    pub fn shape(&self) -> CollectionShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<EntityProxy>> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<EntityProxy>> {
        self.items.get(index)
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.items.iter().map(|item| item.identity()).collect()
    }
}

fn address(proxy: &Arc<EntityProxy>) -> usize {
    Arc::as_ptr(proxy) as usize
}

impl<'a> IntoIterator for &'a ProxyCollection {
    type Item = &'a Arc<EntityProxy>;
    type IntoIter = std::slice::Iter<'a, Arc<EntityProxy>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Value held in a property bag
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Null,
    Scalar(Value),
    Entity(Arc<EntityProxy>),
    Collection(ProxyCollection),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            PropertyValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Arc<EntityProxy>> {
        match self {
            PropertyValue::Entity(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&ProxyCollection> {
        match self {
            PropertyValue::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// JSON form; relations are rendered as identities
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Null => Value::Null,
            PropertyValue::Scalar(value) => value.clone(),
            PropertyValue::Entity(proxy) => json!({ "identity": proxy.identity() }),
            PropertyValue::Collection(collection) => json!({
                "shape": collection.shape().as_str(),
                "identities": collection.identities(),
            }),
        }
    }

    /// Bag value for a SET argument
    pub(crate) fn from_argument(argument: &Argument) -> Result<Self> {
        match argument {
            Argument::Value(Value::Null) => Ok(PropertyValue::Null),
            Argument::Value(value) => Ok(PropertyValue::Scalar(value.clone())),
            Argument::Proxy(ProxyHandle::Entity(proxy)) => Ok(PropertyValue::Entity(proxy.clone())),
            Argument::Proxy(ProxyHandle::Value(_)) => Err(ProxyError::InvalidArgument(
                "value proxies cannot be stored in a property bag".to_string(),
            )),
            Argument::Entity(_) => Err(ProxyError::InvalidArgument(
                "raw entities must be wrapped by the proxy factory first".to_string(),
            )),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PropertyValue::Null,
            other => PropertyValue::Scalar(other),
        }
    }
}

/// Per-proxy property bag plus object intrinsics
pub struct PropertyStore {
    intrinsics: ObjectIntrinsics,
    values: RwLock<HashMap<String, PropertyValue>>,
}

impl PropertyStore {
    pub(crate) fn new(intrinsics: ObjectIntrinsics) -> Self {
        Self {
            intrinsics,
            values: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn intrinsics(&self) -> &ObjectIntrinsics {
        &self.intrinsics
    }

    /// Classify a call by the accessor naming convention
    pub fn classify(&self, call_name: &str, arity: usize) -> Property {
        Property::classify(call_name, arity)
    }

    pub fn get(&self, property: &str) -> Option<PropertyValue> {
        self.values.read().get(property).cloned()
    }

    pub fn set(&self, property: impl Into<String>, value: PropertyValue) {
        self.values.write().insert(property.into(), value);
    }

    /// Store `value` unless the property is already present; returns the stored value
    pub fn insert_if_absent(&self, property: &str, value: PropertyValue) -> PropertyValue {
        self.values
            .write()
            .entry(property.to_string())
            .or_insert(value)
            .clone()
    }

    /// Store several values under one lock
    pub(crate) fn set_all(&self, entries: Vec<(String, PropertyValue)>) {
        let mut values = self.values.write();
        for (property, value) in entries {
            values.insert(property, value);
        }
    }

    pub fn contains(&self, property: &str) -> bool {
        self.values.read().contains_key(property)
    }

    pub(crate) fn remove(&self, property: &str) -> Option<PropertyValue> {
        self.values.write().remove(property)
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Property names currently held, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Copy of the whole bag
    pub fn entries(&self) -> Vec<(String, PropertyValue)> {
        self.values
            .read()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Whether a call is answered from local state: an intrinsic, or an
    /// accessor for a property already present in the bag
    pub fn handles(&self, call: &Call) -> bool {
        if Intrinsic::recognize(call.name(), call.arity()).is_some() {
            return true;
        }
        let property = self.classify(call.name(), call.arity());
        property.is_accessor() && self.contains(property.name())
    }

    /// Answer a call from the bag; the caller has already excluded intrinsics
    pub(crate) fn answer(&self, property: &Property, call: &Call) -> Result<Reply> {
        match property.kind() {
            PropertyType::Get => Ok(Reply::Value(
                self.get(property.name()).unwrap_or(PropertyValue::Null),
            )),
            PropertyType::Set => {
                let value = PropertyValue::from_argument(call.first_arg()?)?;
                self.set(property.name(), value);
                Ok(Reply::Void)
            }
            PropertyType::Comparable | PropertyType::Undefined => Ok(Reply::Void),
        }
    }
}

static NEXT_VALUE_PROXY: AtomicU64 = AtomicU64::new(1);

/// Proxy for a plain value type, backed only by its property bag
pub struct ValueProxy {
    store: PropertyStore,
}

impl ValueProxy {
    pub fn new(type_name: impl Into<String>) -> Self {
        let hash = NEXT_VALUE_PROXY.fetch_add(1, Ordering::Relaxed);
        Self {
            store: PropertyStore::new(ObjectIntrinsics::new("ValueProxy", type_name, hash)),
        }
    }

    pub fn type_name(&self) -> &str {
        self.store.intrinsics().type_name()
    }

    pub fn get(&self, property: &str) -> Option<PropertyValue> {
        self.store.get(property)
    }

    pub fn set(&self, property: impl Into<String>, value: PropertyValue) {
        self.store.set(property, value);
    }

    pub fn contains(&self, property: &str) -> bool {
        self.store.contains(property)
    }

    pub fn store(&self) -> &PropertyStore {
        &self.store
    }
}

impl Intercept for ValueProxy {
    fn handles(&self, call: &Call) -> bool {
        self.store.handles(call)
    }

    fn invoke(&self, call: &Call) -> Result<Reply> {
        if let Some(intrinsic) = Intrinsic::recognize(call.name(), call.arity()) {
            let receiver = self as *const Self as *const ();
            return self.store.intrinsics().answer(receiver, intrinsic, call.args());
        }
        let property = self.store.classify(call.name(), call.arity());
        self.store.answer(&property, call)
    }
}

impl fmt::Debug for ValueProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.store.intrinsics().describe())
    }
}
