//! Entity schema module
//!
//! Explicit descriptor tables for persisted entity types: which properties an
//! entity exposes, and whether each one is a scalar or a relation to other
//! entities.

pub mod entity;
pub mod types;

pub use entity::{Capability, EntitySchema};
pub use types::{CollectionShape, Identity, PropertyDescriptor, PropertyKind};
