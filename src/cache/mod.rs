//! Cache Module
//!
//! Derived-content caching: storage drivers, key derivation, the cache-aside
//! engine and the asset-list specialization built on it.

mod assets;
mod cacheable;
mod driver;
mod entry;
mod key;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use assets::{AssetDescriptor, AssetKind, AssetListCache, AssetManifest};
pub use cacheable::{Cacheable, LocalInvalidation};
pub use driver::{
    DriverConstructor, DriverRegistry, PathResolver, PersistentDriver, RootDirResolver,
    StorageDriver, VolatileDriver,
};
pub use entry::{epoch, CacheEntry};
pub use key::KeyBuilder;
pub use stats::CacheStats;
