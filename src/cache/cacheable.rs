//! Cacheable Module
//!
//! Cache-aside engine: returns a stored artifact or runs the caller's
//! generator, stores the result and returns it.
//!
//! A fingerprint-keyed cache also stores, under `namespace:name:current`,
//! the fingerprinted key `name` last resolved to. Any instance sharing the
//! backend (another worker, a restarted process, the admin daemon) reads it
//! to find the entry to invalidate.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::entry::epoch;
use crate::cache::{CacheStats, DriverRegistry, KeyBuilder, StorageDriver};
use crate::config::CacheConfiguration;
use crate::error::{CacheError, Result};

// == Local Invalidation ==
/// What invalidating a name did to the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalInvalidation {
    /// A stored entry was deleted
    Removed,
    /// Nothing was stored under the name
    Absent,
    /// The backend refused a delete; stale content may remain
    Failed,
}

impl LocalInvalidation {
    /// True unless stale content may still be served.
    pub fn is_cleared(self) -> bool {
        self != Self::Failed
    }

    /// Combines the outcomes of invalidating several keys.
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Failed, _) | (_, Self::Failed) => Self::Failed,
            (Self::Removed, _) | (_, Self::Removed) => Self::Removed,
            _ => Self::Absent,
        }
    }
}

// == Cacheable ==
/// One cache type bound to its storage backend.
///
/// Cloning is cheap and clones share the backend, stats and fingerprint
/// tracking.
#[derive(Debug, Clone)]
pub struct Cacheable {
    config: CacheConfiguration,
    driver: Arc<dyn StorageDriver>,
    keys: KeyBuilder,
    /// Last fingerprinted key this instance published per name
    last_keys: Arc<RwLock<HashMap<String, String>>>,
    stats: Arc<RwLock<CacheStats>>,
}

impl Cacheable {
    // == Constructors ==
    pub fn new(config: CacheConfiguration, driver: Arc<dyn StorageDriver>) -> Self {
        Self {
            config,
            driver,
            keys: KeyBuilder::new(),
            last_keys: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(CacheStats::new())),
        }
    }

    /// Resolves the backend through `registry` once, at construction.
    pub fn from_registry(config: CacheConfiguration, registry: &DriverRegistry) -> Result<Self> {
        let driver = registry.create(&config)?;
        Ok(Self::new(config, driver))
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn config(&self) -> &CacheConfiguration {
        &self.config
    }

    pub fn driver(&self) -> &Arc<dyn StorageDriver> {
        &self.driver
    }

    // == Key Resolution ==
    /// Storage key for `name` given the generator's inputs.
    ///
    /// Inputs are ignored unless the cache is fingerprint-keyed.
    pub fn key_for<S: AsRef<str>>(&self, name: &str, inputs: &[S]) -> String {
        if self.config.fingerprint_keyed {
            self.keys
                .build_fingerprinted(&self.config.namespace, name, inputs)
        } else {
            self.keys.build(&self.config.namespace, name)
        }
    }

    /// Fingerprinted key recorded in the backend for `name`.
    async fn stored_current_key(&self, name: &str) -> Option<String> {
        let pointer = self.keys.build_current(&self.config.namespace, name);
        match self.driver.get(&pointer).await {
            Ok(key) if self.keys.is_fingerprinted_for(&self.config.namespace, name, &key) => {
                Some(key)
            }
            Ok(_) => {
                warn!(key = %pointer, "Ignoring malformed current-key record");
                None
            }
            Err(CacheError::NotFound(_)) => None,
            Err(e) => {
                warn!(key = %pointer, error = %e, "Current-key record unreadable");
                None
            }
        }
    }

    /// Key holding the current artifact for `name`, if one can be located.
    async fn current_key(&self, name: &str) -> Option<String> {
        if !self.config.fingerprint_keyed {
            return Some(self.keys.build(&self.config.namespace, name));
        }
        match self.stored_current_key(name).await {
            Some(key) => Some(key),
            None => self.last_keys.read().await.get(name).cloned(),
        }
    }

    /// Records `key` as the current key for `name` in the backend.
    ///
    /// Written when this instance first sees a key for `name` and on every
    /// miss, so the record follows the latest generation.
    async fn publish_current_key(&self, name: &str, key: &str, force: bool) {
        let mut last_keys = self.last_keys.write().await;
        if !force && last_keys.get(name).map(String::as_str) == Some(key) {
            return;
        }
        last_keys.insert(name.to_string(), key.to_string());

        let pointer = self.keys.build_current(&self.config.namespace, name);
        if !self.driver.store(&pointer, key).await {
            self.stats.write().await.record_store_failure();
            warn!(key = %pointer, "Current-key record not stored");
        }
    }

    // == Get Or Generate ==
    /// Cache-aside lookup with no generator inputs.
    pub async fn get_or_generate<F, Fut>(&self, name: &str, generator: F) -> Result<String>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.get_or_generate_from::<&str, _, _>(name, &[], generator)
            .await
    }

    /// Cache-aside lookup keyed by `name` and, when fingerprint-keyed, `inputs`.
    ///
    /// On a hit the generator is never called. On a miss it is called exactly
    /// once; a failure is returned unchanged and nothing is stored. A refused
    /// write still returns the generated content.
    ///
    /// Generation and the following store run in a spawned task, so dropping
    /// the returned future does not discard the work.
    pub async fn get_or_generate_from<S, F, Fut>(
        &self,
        name: &str,
        inputs: &[S],
        generator: F,
    ) -> Result<String>
    where
        S: AsRef<str>,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        let key = self.key_for(name, inputs);

        let hit = match self.driver.get(&key).await {
            Ok(content) => Some(content),
            Err(CacheError::NotFound(_)) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, regenerating");
                None
            }
        };
        if self.config.fingerprint_keyed {
            self.publish_current_key(name, &key, hit.is_none()).await;
        }
        if let Some(content) = hit {
            self.stats.write().await.record_hit();
            debug!(key = %key, "Cache hit");
            return Ok(content);
        }

        self.stats.write().await.record_miss();
        debug!(key = %key, "Cache miss, generating");

        let driver = Arc::clone(&self.driver);
        let stats = Arc::clone(&self.stats);
        let task = tokio::spawn(async move {
            let content = match generator().await {
                Ok(content) => content,
                Err(e) => {
                    stats.write().await.record_generation_failure();
                    warn!(key = %key, error = %e, "Generator failed");
                    return Err(CacheError::Generation(e));
                }
            };
            stats.write().await.record_generation();

            if !driver.store(&key, &content).await {
                stats.write().await.record_store_failure();
                warn!(key = %key, "Artifact not cached, serving uncached content");
            }
            Ok(content)
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(CacheError::Generation(anyhow::anyhow!(
                "generator task did not complete: {}",
                e
            ))),
        }
    }

    // == Invalidate ==
    /// Deletes the current artifact for `name`.
    ///
    /// For a fingerprint-keyed cache the target is read from the backend's
    /// current-key record, plus whatever key this instance last used. Older
    /// fingerprints are left in place; they are unreachable once the inputs
    /// change. The record itself is kept so later generations overwrite it.
    pub async fn invalidate(&self, name: &str) -> LocalInvalidation {
        let mut targets = Vec::with_capacity(2);
        if self.config.fingerprint_keyed {
            targets.extend(self.stored_current_key(name).await);
            if let Some(local) = self.last_keys.read().await.get(name) {
                if !targets.contains(local) {
                    targets.push(local.clone());
                }
            }
        } else {
            targets.push(self.keys.build(&self.config.namespace, name));
        }

        let mut outcome = LocalInvalidation::Absent;
        for key in &targets {
            let existed = self.driver.exists(key).await;
            let step = if !self.driver.delete(key).await {
                LocalInvalidation::Failed
            } else if existed {
                LocalInvalidation::Removed
            } else {
                LocalInvalidation::Absent
            };
            outcome = outcome.merge(step);
        }

        self.stats.write().await.record_invalidation();
        info!(
            namespace = %self.config.namespace,
            name,
            outcome = ?outcome,
            "Invalidated artifact"
        );
        outcome
    }

    // == Freshness Queries ==
    pub async fn exists(&self, name: &str) -> bool {
        match self.current_key(name).await {
            Some(key) => self.driver.exists(&key).await,
            None => false,
        }
    }

    /// Store time of the current artifact, or the Unix epoch when absent.
    pub async fn last_modified(&self, name: &str) -> DateTime<Utc> {
        match self.current_key(name).await {
            Some(key) => self.driver.last_modified(&key).await,
            None => epoch(),
        }
    }

    /// True when the artifact is missing or older than its external source.
    pub async fn is_stale(&self, name: &str, source_modified: DateTime<Utc>) -> bool {
        let Some(key) = self.current_key(name).await else {
            return true;
        };
        if !self.driver.exists(&key).await {
            return true;
        }
        self.driver.last_modified(&key).await < source_modified
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }
}
