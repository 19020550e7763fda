//! Type definitions for entity schemas

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric key assigned to a persisted entity by the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(u64);

impl Identity {
    /// Create an identity from its raw value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for Identity {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Concrete collection family a relation is materialized into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionShape {
    /// Ordered, duplicates kept
    List,
    /// Insertion ordered, no duplicates
    Set,
    /// Ordered by identity, no duplicates
    SortedSet,
}

impl CollectionShape {
    /// Convert shape to string for diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionShape::List => "list",
            CollectionShape::Set => "set",
            CollectionShape::SortedSet => "sorted_set",
        }
    }

    /// Parse shape from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "list" => Some(CollectionShape::List),
            "set" => Some(CollectionShape::Set),
            "sorted_set" | "sortedset" => Some(CollectionShape::SortedSet),
            _ => None,
        }
    }

    /// Whether members may repeat
    pub fn allows_duplicates(&self) -> bool {
        matches!(self, CollectionShape::List)
    }
}

/// Kind of value a property holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// Plain value, copied eagerly into the property bag
    Scalar,
    /// Reference to a single persisted entity
    Entity,
    /// Collection of persisted entities
    Collection(CollectionShape),
}

impl PropertyKind {
    /// Relation properties are resolved lazily
    pub fn is_relation(&self) -> bool {
        !matches!(self, PropertyKind::Scalar)
    }

    /// Human readable kind, used in shape mismatch errors
    pub fn describe(&self) -> &'static str {
        match self {
            PropertyKind::Scalar => "scalar",
            PropertyKind::Entity => "entity",
            PropertyKind::Collection(shape) => shape.as_str(),
        }
    }
}

/// Declared property of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Property name without accessor prefix (`Title`, not `getTitle`)
    pub name: String,
    /// Declared kind
    pub kind: PropertyKind,
}

impl PropertyDescriptor {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Scalar property
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Scalar)
    }

    /// Single entity relation
    pub fn entity(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Entity)
    }

    /// Collection relation
    pub fn collection(name: impl Into<String>, shape: CollectionShape) -> Self {
        Self::new(name, PropertyKind::Collection(shape))
    }

    pub fn is_relation(&self) -> bool {
        self.kind.is_relation()
    }
}
