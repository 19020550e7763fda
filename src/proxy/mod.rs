//! # Proxies
//!
//! Every call made against a proxy passes through the same chain:
//!
//! 1. Object intrinsics (`getClass`, `hashCode`, `toString`, `equals`,
//!    `wait`, `notify`, `notifyAll`) are answered first, identically for
//!    every proxy type. Equality is reference equality of the proxy instance.
//! 2. Remaining calls are classified as GET, SET, COMPARABLE or UNDEFINED by
//!    the accessor naming convention.
//! 3. GET and SET are served from the proxy's property bag. An entity proxy
//!    resolves relation properties that are not yet in its bag by fetching
//!    the owning entity fresh from the backing store.

pub mod call;
pub mod entity;
pub mod intrinsics;
pub mod property;
pub mod value;

pub use call::{Argument, Call, Intercept, ProxyHandle, Reply};
pub use entity::{Comparand, EntityProxy, Resolution};
pub use intrinsics::Intrinsic;
pub use property::{Property, PropertyType};
pub use value::{PropertyStore, PropertyValue, ProxyCollection, ValueProxy};
