//! Storage Drivers
//!
//! The uniform get/store/last-modified/delete contract every backend
//! implements, and the typed factory that picks a backend per cache type.

mod persistent;
mod volatile;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::entry::epoch;
use crate::config::{CacheConfiguration, Config, DriverKind};
use crate::error::{CacheError, Result};

pub use persistent::{PathResolver, PersistentDriver, RootDirResolver};
pub use volatile::VolatileDriver;

// == Storage Driver ==
/// Backend contract shared by all storage implementations.
///
/// A key maps to at most one content value; readers never observe a
/// partially written value.
#[async_trait]
pub trait StorageDriver: Send + Sync + fmt::Debug {
    /// Backend identifier, for logging and stats.
    fn kind(&self) -> DriverKind;

    /// Returns the stored content, or `CacheError::NotFound`.
    async fn get(&self, key: &str) -> Result<String>;

    /// Creates or overwrites. Returns `false` on a non-fatal write failure.
    async fn store(&self, key: &str, content: &str) -> bool;

    /// Store time of the entry, or the Unix epoch when absent.
    async fn last_modified(&self, key: &str) -> DateTime<Utc>;

    /// Idempotent: deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> bool;

    /// Defaults to a non-epoch store time; backends that can see the entry
    /// directly override it.
    async fn exists(&self, key: &str) -> bool {
        self.last_modified(key).await > epoch()
    }
}

/// Builds a driver for a cache type. Registered under a custom name.
pub type DriverConstructor =
    Box<dyn Fn(&CacheConfiguration) -> Arc<dyn StorageDriver> + Send + Sync>;

// == Driver Registry ==
/// Typed factory mapping a [`DriverKind`] to a backend instance.
///
/// Volatile drivers are shared per namespace so every cache instance of
/// the same type sees the same in-process map.
pub struct DriverRegistry {
    config: Config,
    resolver: Arc<dyn PathResolver>,
    custom: HashMap<String, DriverConstructor>,
    volatile: Mutex<HashMap<String, Arc<VolatileDriver>>>,
}

impl DriverRegistry {
    /// Creates a registry rooted at `config.cache_dir`.
    pub fn new(config: Config) -> Self {
        let resolver = Arc::new(RootDirResolver::new(config.cache_dir.clone()));
        Self::with_resolver(config, resolver)
    }

    pub fn with_resolver(config: Config, resolver: Arc<dyn PathResolver>) -> Self {
        Self {
            config,
            resolver,
            custom: HashMap::new(),
            volatile: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a constructor selectable through `DriverKind::Custom(name)`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&CacheConfiguration) -> Arc<dyn StorageDriver> + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Box::new(constructor));
    }

    // == Create ==
    /// Resolves and constructs the backend for `cache`.
    ///
    /// Called once per cache instance, never per operation.
    pub fn create(&self, cache: &CacheConfiguration) -> Result<Arc<dyn StorageDriver>> {
        let kind = self.config.resolve_driver(cache);
        debug!(namespace = %cache.namespace, driver = %kind, "Resolving storage driver");

        match kind {
            DriverKind::Persistent => {
                let driver: Arc<dyn StorageDriver> = Arc::new(PersistentDriver::new(
                    self.resolver.as_ref(),
                    &cache.namespace,
                ));
                Ok(driver)
            }
            DriverKind::Volatile => {
                let mut shared = self
                    .volatile
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let driver: Arc<dyn StorageDriver> = shared
                    .entry(cache.namespace.clone())
                    .or_insert_with(|| Arc::new(VolatileDriver::new()))
                    .clone();
                Ok(driver)
            }
            DriverKind::Custom(name) => match self.custom.get(&name) {
                Some(constructor) => Ok(constructor(cache)),
                None => Err(CacheError::InvalidRequest(format!(
                    "No storage driver registered under '{}'",
                    name
                ))),
            },
        }
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("config", &self.config)
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(dir: &std::path::Path) -> DriverRegistry {
        DriverRegistry::new(Config {
            cache_dir: dir.to_path_buf(),
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn test_create_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());

        let durable = registry
            .create(&CacheConfiguration::new("cacheable_assets").persistent())
            .unwrap();
        assert_eq!(durable.kind(), DriverKind::Persistent);

        let fast = registry.create(&CacheConfiguration::new("templates")).unwrap();
        assert_eq!(fast.kind(), DriverKind::Volatile);
    }

    #[tokio::test]
    async fn test_volatile_drivers_shared_per_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path());

        let a = registry.create(&CacheConfiguration::new("templates")).unwrap();
        let b = registry.create(&CacheConfiguration::new("templates")).unwrap();
        let other = registry.create(&CacheConfiguration::new("fragments")).unwrap();

        assert!(a.store("templates:home", "<h1>").await);
        assert_eq!(b.get("templates:home").await.unwrap(), "<h1>");
        assert!(other.get("templates:home").await.is_err());
    }

    #[tokio::test]
    async fn test_custom_driver() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry(dir.path());
        registry.register("scratch", |_| -> Arc<dyn StorageDriver> {
            Arc::new(VolatileDriver::new())
        });

        let cache = CacheConfiguration::new("templates")
            .with_driver(DriverKind::Custom("scratch".to_string()));
        assert!(registry.create(&cache).is_ok());

        let missing = CacheConfiguration::new("templates")
            .with_driver(DriverKind::Custom("redis".to_string()));
        assert!(matches!(
            registry.create(&missing),
            Err(CacheError::InvalidRequest(_))
        ));
    }
}
