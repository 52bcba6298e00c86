//! Cache Statistics Module
//!
//! Tracks per-cache-type counters for hits, misses, generations and failures.

use serde::Serialize;

// == Cache Stats ==
/// Counters for one `Cacheable` instance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Lookups served from the backend
    pub hits: u64,
    /// Lookups that had to run the generator
    pub misses: u64,
    /// Generator runs that produced content
    pub generations: u64,
    /// Generator runs that failed
    pub generation_failures: u64,
    /// Writes the backend refused
    pub store_failures: u64,
    /// Explicit invalidations
    pub invalidations: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_generation(&mut self) {
        self.generations += 1;
    }

    pub fn record_generation_failure(&mut self) {
        self.generation_failures += 1;
    }

    pub fn record_store_failure(&mut self) {
        self.store_failures += 1;
    }

    pub fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }
}
