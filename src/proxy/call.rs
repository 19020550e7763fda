//! Receiving side of call interception
//!
//! A host that routes calls made against a proxy describes each call as a
//! [`Call`] (name plus arguments) and hands it to [`Intercept::invoke`].

use crate::error::{ProxyError, Result};
use crate::proxy::entity::EntityProxy;
use crate::proxy::property::{GET_PREFIX, SET_PREFIX};
use crate::proxy::value::{PropertyValue, ValueProxy};
use crate::store::EntityRef;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Shared handle to any proxy
#[derive(Clone)]
pub enum ProxyHandle {
    Entity(Arc<EntityProxy>),
    Value(Arc<ValueProxy>),
}

impl ProxyHandle {
    /// Address of the proxy instance, the basis of proxy equality
    pub fn addr(&self) -> *const () {
        match self {
            ProxyHandle::Entity(proxy) => Arc::as_ptr(proxy) as *const (),
            ProxyHandle::Value(proxy) => Arc::as_ptr(proxy) as *const (),
        }
    }

    /// Same proxy instance
    pub fn same_as(&self, other: &ProxyHandle) -> bool {
        self.addr() == other.addr()
    }
}

impl fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyHandle::Entity(proxy) => write!(f, "{:?}", proxy),
            ProxyHandle::Value(proxy) => write!(f, "{:?}", proxy),
        }
    }
}

/// Argument of an intercepted call
#[derive(Debug, Clone)]
pub enum Argument {
    Value(Value),
    Proxy(ProxyHandle),
    Entity(EntityRef),
}

impl Argument {
    /// Non-negative integer argument, as used by monitor waits
    pub(crate) fn as_u64(&self) -> Result<u64> {
        match self {
            Argument::Value(value) => value.as_u64().ok_or_else(|| {
                ProxyError::InvalidArgument(format!("expected non-negative integer, got {}", value))
            }),
            other => Err(ProxyError::InvalidArgument(format!(
                "expected non-negative integer, got {:?}",
                other
            ))),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

impl From<Arc<EntityProxy>> for Argument {
    fn from(proxy: Arc<EntityProxy>) -> Self {
        Argument::Proxy(ProxyHandle::Entity(proxy))
    }
}

impl From<Arc<ValueProxy>> for Argument {
    fn from(proxy: Arc<ValueProxy>) -> Self {
        Argument::Proxy(ProxyHandle::Value(proxy))
    }
}

/// An intercepted call: name and arguments
#[derive(Debug, Clone)]
pub struct Call {
    name: String,
    args: Vec<Argument>,
}

impl Call {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<Argument>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `get<property>()`
    pub fn getter(property: &str) -> Self {
        Self::new(format!("{}{}", GET_PREFIX, property))
    }

    /// `set<property>(value)`
    pub fn setter(property: &str, value: impl Into<Argument>) -> Self {
        Self::new(format!("{}{}", SET_PREFIX, property)).with_arg(value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// First argument, required by SET and ordering calls
    pub(crate) fn first_arg(&self) -> Result<&Argument> {
        self.args
            .first()
            .ok_or_else(|| ProxyError::InvalidArgument(format!("{} expects an argument", self.name)))
    }
}

/// Answer to an intercepted call
#[derive(Debug, Clone)]
pub enum Reply {
    /// Call has no result
    Void,
    Value(PropertyValue),
    Bool(bool),
    Hash(u64),
    Text(String),
    TypeName(String),
    Ordering(Ordering),
}

impl Reply {
    pub fn as_value(&self) -> Option<&PropertyValue> {
        match self {
            Reply::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Reply::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Implemented by every proxy type
pub trait Intercept {
    /// Whether this proxy answers `call` from local state
    fn handles(&self, call: &Call) -> bool;

    /// Service an intercepted call
    fn invoke(&self, call: &Call) -> Result<Reply>;
}

impl Intercept for ProxyHandle {
    fn handles(&self, call: &Call) -> bool {
        match self {
            ProxyHandle::Entity(proxy) => proxy.handles(call),
            ProxyHandle::Value(proxy) => proxy.handles(call),
        }
    }

    fn invoke(&self, call: &Call) -> Result<Reply> {
        match self {
            ProxyHandle::Entity(proxy) => proxy.invoke(call),
            ProxyHandle::Value(proxy) => proxy.invoke(call),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_builders() {
        let call = Call::getter("Title");
        assert_eq!(call.name(), "getTitle");
        assert_eq!(call.arity(), 0);
        assert!(call.first_arg().is_err());

        let call = Call::setter("Title", json!("Dune"));
        assert_eq!(call.name(), "setTitle");
        assert_eq!(call.arity(), 1);
        assert!(matches!(call.first_arg().unwrap(), Argument::Value(v) if v == &json!("Dune")));
    }

    #[test]
    fn test_argument_as_u64() {
        assert_eq!(Argument::Value(json!(25)).as_u64().unwrap(), 25);
        assert!(Argument::Value(json!(-1)).as_u64().is_err());
        assert!(Argument::Value(json!("x")).as_u64().is_err());
    }

    #[test]
    fn test_value_proxy_handles_are_compared_by_address() {
        let a = ProxyHandle::Value(Arc::new(ValueProxy::new("Point")));
        let b = ProxyHandle::Value(Arc::new(ValueProxy::new("Point")));
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }
}
