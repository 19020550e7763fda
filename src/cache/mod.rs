//! # Session Identity Map
//!
//! One [`SessionCache`] exists per logical session. It maps each identity to
//! the single proxy standing for that entity, so walking the object graph
//! from different starting points always meets the same proxy instances.
//!
//! ## Example
//!
//! ```rust
//! use ouroboros_proxy::cache::SessionCache;
//! use ouroboros_proxy::config::ProxyConfig;
//! use ouroboros_proxy::schema::Identity;
//!
//! let cache = SessionCache::open(&ProxyConfig::default());
//! assert!(cache.get(Identity::new(1)).is_none());
//! assert_eq!(cache.stats().misses, 1);
//!
//! cache.close();
//! assert!(cache.is_closed());
//! ```

pub mod store;
pub mod types;

pub use store::SessionCache;
pub use types::CacheStats;
