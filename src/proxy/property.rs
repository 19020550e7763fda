//! Property classification of intercepted calls
//!
//! `get<Name>` / `is<Name>` with no arguments read a property, `set<Name>`
//! with one argument writes it. Entity proxies additionally recognize the
//! single-argument ordering call.

use serde::{Deserialize, Serialize};

pub(crate) const GET_PREFIX: &str = "get";
pub(crate) const IS_PREFIX: &str = "is";
pub(crate) const SET_PREFIX: &str = "set";
pub(crate) const COMPARE_TO: &str = "compareTo";

/// Category of an intercepted call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Get,
    Set,
    Comparable,
    Undefined,
}

/// Property addressed by a call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Property {
    name: String,
    kind: PropertyType,
}

impl Property {
    pub fn new(name: impl Into<String>, kind: PropertyType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Classify a call by the accessor naming convention
    ///
    /// Calls that match no convention are `Undefined` and keep their full name.
    pub fn classify(call_name: &str, arity: usize) -> Self {
        if arity == 0 {
            if let Some(name) = call_name.strip_prefix(GET_PREFIX) {
                return Self::new(name, PropertyType::Get);
            }
            if let Some(name) = call_name.strip_prefix(IS_PREFIX) {
                return Self::new(name, PropertyType::Get);
            }
        }
        if arity == 1 {
            if let Some(name) = call_name.strip_prefix(SET_PREFIX) {
                return Self::new(name, PropertyType::Set);
            }
        }
        Self::new(call_name, PropertyType::Undefined)
    }

    /// Classify a call made against an entity proxy
    pub fn classify_entity(call_name: &str, arity: usize) -> Self {
        let property = Self::classify(call_name, arity);
        if property.kind == PropertyType::Undefined && call_name == COMPARE_TO && arity == 1 {
            return Self::new(call_name, PropertyType::Comparable);
        }
        property
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PropertyType {
        self.kind
    }

    /// GET or SET
    pub fn is_accessor(&self) -> bool {
        matches!(self.kind, PropertyType::Get | PropertyType::Set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getter_classification() {
        let property = Property::classify("getTitle", 0);
        assert_eq!(property.name(), "Title");
        assert_eq!(property.kind(), PropertyType::Get);

        let property = Property::classify("isActive", 0);
        assert_eq!(property.name(), "Active");
        assert_eq!(property.kind(), PropertyType::Get);

        // A getter with arguments is not an accessor
        assert_eq!(Property::classify("getTitle", 1).kind(), PropertyType::Undefined);
    }

    #[test]
    fn test_setter_classification() {
        let property = Property::classify("setTitle", 1);
        assert_eq!(property.name(), "Title");
        assert_eq!(property.kind(), PropertyType::Set);

        assert_eq!(Property::classify("setTitle", 0).kind(), PropertyType::Undefined);
        assert_eq!(Property::classify("setTitle", 2).kind(), PropertyType::Undefined);
    }

    #[test]
    fn test_undefined_keeps_full_name() {
        let property = Property::classify("refresh", 0);
        assert_eq!(property.name(), "refresh");
        assert_eq!(property.kind(), PropertyType::Undefined);
        assert!(!property.is_accessor());
    }

    #[test]
    fn test_comparable_only_for_entities() {
        assert_eq!(Property::classify("compareTo", 1).kind(), PropertyType::Undefined);

        let property = Property::classify_entity("compareTo", 1);
        assert_eq!(property.kind(), PropertyType::Comparable);
        assert_eq!(
            Property::classify_entity("compareTo", 2).kind(),
            PropertyType::Undefined
        );
        assert_eq!(
            Property::classify_entity("getTitle", 0).kind(),
            PropertyType::Get
        );
    }
}
