//! Identity map statistics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics for identity map usage
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by an existing proxy
    pub hits: u64,

    /// Lookups that found no proxy
    pub misses: u64,

    /// Number of proxies currently mapped
    pub entries: usize,

    /// Proxies added to the map
    pub inserts: u64,

    /// Number of times the map was cleared
    pub clears: u64,

    /// Proxies dropped by clears
    pub invalidated: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, inserts: {}, clears: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.inserts,
            self.clears
        )
    }
}
