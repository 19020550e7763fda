//! # Ouroboros Proxy (ouroboros-proxy)
//!
//! A lazy-materializing, identity-mapped proxy layer for persisted object graphs.
//!
//! ## Features
//!
//! - One proxy per entity identity within a session
//! - Scalar properties copied eagerly, relations resolved on first access
//! - Relation resolution always reads a fresh snapshot from the backing store
//! - Scalar merge and deep merge into existing proxies without breaking identity
//! - Explicit entity schemas instead of accessor naming conventions
//! - Call interception adapter with reference-based object intrinsics
//!
//! ## Walking a Graph
//!
//! ```rust
//! use ouroboros_proxy::{
//!     Capability, EntitySchema, Identity, InMemoryStore, PropertyDescriptor, ProxyConfig,
//!     Record, SessionRegistry,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let author = EntitySchema::new("Author")
//!         .implements(Capability::new("Author").scalar("Name").shared())
//!         .shared();
//!     let book = EntitySchema::new("Book")
//!         .implements(
//!             Capability::new("Book")
//!                 .scalar("Title")
//!                 .property(PropertyDescriptor::entity("Author"))
//!                 .shared(),
//!         )
//!         .shared();
//!
//!     let store = InMemoryStore::new();
//!     store.insert(Record::new(author, Identity::new(1)).with_scalar("Name", "Le Guin"));
//!     store.insert(
//!         Record::new(book, Identity::new(10))
//!             .with_scalar("Title", "The Dispossessed")
//!             .with_ref("Author", "Author", Identity::new(1)),
//!     );
//!
//!     let registry = SessionRegistry::new(Arc::new(store.clone()), ProxyConfig::default());
//!     let session = registry.open();
//!
//!     let entity = store.snapshot("Book", Identity::new(10)).expect("seeded");
//!     let book = session.proxy(entity)?;
//!     let author = book.get("Author")?;
//!     let author = author.as_entity().expect("author is set");
//!     assert_eq!(author.identity(), Identity::new(1));
//!
//!     registry.close(session.id());
//!     Ok(())
//! }
//! ```
//!
//! ## Intercepted Calls
//!
//! Hosts that route calls by accessor name use [`Call`] and [`Intercept`]:
//!
//! ```rust
//! use ouroboros_proxy::{Call, Intercept, ValueProxy};
//! use serde_json::json;
//!
//! let point = ValueProxy::new("Point");
//! point.invoke(&Call::setter("X", json!(3))).unwrap();
//! let x = point.invoke(&Call::getter("X")).unwrap();
//! assert_eq!(x.as_value().and_then(|v| v.as_scalar()), Some(&json!(3)));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod proxy;
pub mod schema;
pub mod session;
pub mod store;

// Re-export main types for convenience
pub use cache::{CacheStats, SessionCache};
pub use config::{MissingEntityPolicy, ProxyConfig, ProxyConfigBuilder};
pub use error::{AccessError, ProxyError, Result};
pub use factory::ProxyFactory;
pub use proxy::{
    Argument, Call, Comparand, EntityProxy, Intercept, Intrinsic, Property, PropertyStore,
    PropertyType, PropertyValue, ProxyCollection, ProxyHandle, Reply, Resolution, ValueProxy,
};
pub use schema::{
    Capability, CollectionShape, EntitySchema, Identity, PropertyDescriptor, PropertyKind,
};
pub use session::{Session, SessionRegistry};
pub use store::{
    unwrap_entity, BackingStore, EntityRef, InMemoryStore, PersistedEntity, RawValue, Record,
    StoredValue,
};
