//! Capabilities and entity schemas
//!
//! An entity type declares which capabilities it implements. A capability is a
//! named group of property descriptors and may extend other capabilities. The
//! flattened descriptor table of a schema is what proxies use to decide which
//! properties are copied eagerly and which are resolved on first access.

use crate::schema::types::PropertyDescriptor;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Named group of properties an entity type may implement
#[derive(Debug, Clone)]
pub struct Capability {
    name: String,
    extends: Vec<Arc<Capability>>,
    properties: Vec<PropertyDescriptor>,
}

impl Capability {
    /// Create an empty capability
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Inherit every property of `parent`
    pub fn extends(mut self, parent: Arc<Capability>) -> Self {
        self.extends.push(parent);
        self
    }

    /// Declare a property
    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.properties.push(descriptor);
        self
    }

    /// Declare a scalar property
    pub fn scalar(self, name: impl Into<String>) -> Self {
        self.property(PropertyDescriptor::scalar(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties declared directly on this capability
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Wrap into an `Arc` for sharing between schemas
    pub fn shared(self) -> Arc<Capability> {
        Arc::new(self)
    }
}

/// Declared capability set of one entity type
#[derive(Debug, Clone)]
pub struct EntitySchema {
    type_name: String,
    capabilities: Vec<Arc<Capability>>,
    descriptors: Vec<PropertyDescriptor>,
}

impl EntitySchema {
    /// Create a schema without capabilities
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            capabilities: Vec::new(),
            descriptors: Vec::new(),
        }
    }

    /// Add an implemented capability and rebuild the descriptor table
    pub fn implements(mut self, capability: Arc<Capability>) -> Self {
        self.capabilities.push(capability);
        self.descriptors = self.flatten();
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// All capabilities, transitively, parents first, each listed once
    pub fn capabilities(&self) -> Vec<&Capability> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for capability in &self.capabilities {
            collect_capabilities(capability, &mut seen, &mut ordered);
        }
        ordered
    }

    /// Flattened descriptor table
    pub fn descriptors(&self) -> &[PropertyDescriptor] {
        &self.descriptors
    }

    /// Look up one descriptor by property name
    pub fn descriptor(&self, property: &str) -> Option<&PropertyDescriptor> {
        self.descriptors.iter().find(|d| d.name == property)
    }

    /// Descriptors copied eagerly into a new proxy
    pub fn scalar_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.descriptors.iter().filter(|d| !d.is_relation())
    }

    /// Descriptors resolved lazily
    pub fn relation_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.descriptors.iter().filter(|d| d.is_relation())
    }

    /// Wrap into an `Arc` for sharing between entities
    pub fn shared(self) -> Arc<EntitySchema> {
        Arc::new(self)
    }

    fn flatten(&self) -> Vec<PropertyDescriptor> {
        let mut descriptors: Vec<PropertyDescriptor> = Vec::new();
        for capability in self.capabilities() {
            for descriptor in capability.properties() {
                match descriptors.iter().find(|d| d.name == descriptor.name) {
                    None => descriptors.push(descriptor.clone()),
                    Some(existing) if existing.kind != descriptor.kind => {
                        warn!(
                            "{}: property {} redeclared as {} by {}, keeping {}",
                            self.type_name,
                            descriptor.name,
                            descriptor.kind.describe(),
                            capability.name(),
                            existing.kind.describe()
                        );
                    }
                    Some(_) => {}
                }
            }
        }
        descriptors
    }
}

fn collect_capabilities<'a>(
    capability: &'a Arc<Capability>,
    seen: &mut HashSet<&'a str>,
    ordered: &mut Vec<&'a Capability>,
) {
    if seen.contains(capability.name()) {
        return;
    }
    for parent in &capability.extends {
        collect_capabilities(parent, seen, ordered);
    }
    if seen.insert(capability.name()) {
        ordered.push(&**capability);
    }
}
