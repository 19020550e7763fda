//! Error types for proxy operations
//!
//! Two layers of failure exist here. [`AccessError`] describes a failed
//! accessor invocation on a raw entity; the proxy layer logs it and degrades
//! to a null value. [`ProxyError`] covers everything that must reach the
//! caller: contract violations, missing data under the strict policy and
//! failures reported by the backing store.

use crate::schema::Identity;
use thiserror::Error;

/// Failure while invoking an accessor on a raw persisted entity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The accessor exists but may not be invoked
    #[error("Access denied to '{property}': {reason}")]
    Denied { property: String, reason: String },

    /// The accessor was invoked and failed
    #[error("Invocation of '{property}' failed: {reason}")]
    Invocation { property: String, reason: String },

    /// The entity does not expose the accessor at all
    #[error("No accessor for '{property}'")]
    NoSuchAccessor { property: String },
}

impl AccessError {
    /// Name of the property whose accessor failed
    pub fn property(&self) -> &str {
        match self {
            AccessError::Denied { property, .. }
            | AccessError::Invocation { property, .. }
            | AccessError::NoSuchAccessor { property } => property,
        }
    }
}

/// Main error type for proxy operations
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Fetch-by-identity returned no data
    #[error("Entity not found: {entity_type} with id = {identity}")]
    EntityNotFound {
        entity_type: String,
        identity: Identity,
    },

    /// Entity entering the proxy layer has no identity yet
    #[error("Entity of type {entity_type} has no identity")]
    MissingIdentity { entity_type: String },

    /// Property is not declared by the entity schema
    #[error("Unknown property '{property}' on {entity_type}")]
    UnknownProperty {
        entity_type: String,
        property: String,
    },

    /// Raw value does not fit the declared property kind
    #[error("Shape mismatch for '{property}': declared {expected}, found {found}")]
    ShapeMismatch {
        property: String,
        expected: String,
        found: String,
    },

    /// Entity does not support ordering
    #[error("Entity of type {entity_type} is not comparable")]
    NotComparable { entity_type: String },

    /// Merge source belongs to a different identity than the proxy
    #[error("Identity mismatch: proxy is {expected}, entity is {found}")]
    IdentityMismatch { expected: Identity, found: String },

    /// Call argument could not be interpreted
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The factory that created a proxy no longer exists
    #[error("Proxy factory has been dropped")]
    FactoryDropped,

    /// The session cache was closed
    #[error("Session cache is closed")]
    SessionClosed,

    /// Backing store failure
    #[error("Backing store error: {0}")]
    Store(#[from] anyhow::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for proxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;

impl From<String> for ProxyError {
    fn from(s: String) -> Self {
        ProxyError::Other(s)
    }
}

impl From<&str> for ProxyError {
    fn from(s: &str) -> Self {
        ProxyError::Other(s.to_string())
    }
}
