//! Invalidation Coordinator
//!
//! Clears an artifact from the local cache and then from the accelerator.
//! The two tiers are independent: a failed purge never restores the local
//! entry, and the edge may serve stale content until its own TTL expires.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::accelerator::{Accelerator, AcceleratorTarget};
use crate::cache::{AssetListCache, Cacheable, LocalInvalidation};

/// Above this many URLs a pattern ban is preferred, when one is available.
pub const DEFAULT_MAX_EXACT_PURGES: usize = 16;

// == Edge Scope ==
/// Which served responses depend on the artifact being invalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeScope {
    /// Exact URLs known to serve the artifact
    pub urls: Vec<String>,
    /// Pattern covering variants that cannot be enumerated
    pub pattern: Option<String>,
}

impl EdgeScope {
    /// Local invalidation only.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            pattern: None,
        }
    }

    pub fn urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            pattern: None,
        }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            urls: Vec::new(),
            pattern: Some(pattern.into()),
        }
    }

    /// Pattern to fall back to when the URL list is too long to purge one by one.
    pub fn or_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

// == Invalidation Target ==
/// Everything stored locally for a name, cleared as one unit.
#[async_trait]
pub trait InvalidationTarget: Send + Sync + fmt::Debug {
    async fn invalidate(&self, name: &str) -> LocalInvalidation;
}

#[async_trait]
impl InvalidationTarget for Cacheable {
    async fn invalidate(&self, name: &str) -> LocalInvalidation {
        Cacheable::invalidate(self, name).await
    }
}

/// Manifest and bundle together.
#[async_trait]
impl InvalidationTarget for AssetListCache {
    async fn invalidate(&self, name: &str) -> LocalInvalidation {
        AssetListCache::invalidate(self, name).await
    }
}

// == Reports ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeOutcome {
    pub target: AcceleratorTarget,
    pub accepted: bool,
}

/// Result of one invalidation across both tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    pub name: String,
    pub local: LocalInvalidation,
    /// False when stale content may still be served locally
    pub local_cleared: bool,
    pub purges: Vec<PurgeOutcome>,
}

impl InvalidationReport {
    /// True when every accelerator purge was accepted (or none were needed).
    pub fn accelerator_ok(&self) -> bool {
        self.purges.iter().all(|p| p.accepted)
    }
}

// == Coordinator ==
#[derive(Debug, Clone)]
pub struct InvalidationCoordinator {
    /// Cache reported on in stats and logs
    cache: Cacheable,
    target: Arc<dyn InvalidationTarget>,
    accelerator: Option<Accelerator>,
    max_exact_purges: usize,
}

impl InvalidationCoordinator {
    pub fn new(cache: Cacheable, accelerator: Option<Accelerator>) -> Self {
        let target: Arc<dyn InvalidationTarget> = Arc::new(cache.clone());
        Self::with_target(cache, target, accelerator)
    }

    /// Coordinator over an asset list; invalidation drops manifest and bundle.
    pub fn for_assets(assets: AssetListCache, accelerator: Option<Accelerator>) -> Self {
        let cache = assets.cache().clone();
        let target: Arc<dyn InvalidationTarget> = Arc::new(assets);
        Self::with_target(cache, target, accelerator)
    }

    pub fn with_target(
        cache: Cacheable,
        target: Arc<dyn InvalidationTarget>,
        accelerator: Option<Accelerator>,
    ) -> Self {
        Self {
            cache,
            target,
            accelerator,
            max_exact_purges: DEFAULT_MAX_EXACT_PURGES,
        }
    }

    pub fn with_max_exact_purges(mut self, max: usize) -> Self {
        self.max_exact_purges = max;
        self
    }

    pub fn cache(&self) -> &Cacheable {
        &self.cache
    }

    pub fn accelerator(&self) -> Option<&Accelerator> {
        self.accelerator.as_ref()
    }

    // == Plan ==
    /// Chooses accelerator targets for `scope`.
    ///
    /// Exact purges when URLs are known, unless there are more than
    /// `max_exact_purges` and a pattern is available; a ban otherwise.
    pub fn plan(&self, scope: &EdgeScope) -> Vec<AcceleratorTarget> {
        let too_many = scope.urls.len() > self.max_exact_purges;
        match (&scope.pattern, scope.urls.is_empty()) {
            (Some(pattern), true) => vec![AcceleratorTarget::Pattern(pattern.clone())],
            (Some(pattern), false) if too_many => {
                vec![AcceleratorTarget::Pattern(pattern.clone())]
            }
            _ => scope
                .urls
                .iter()
                .cloned()
                .map(AcceleratorTarget::Url)
                .collect(),
        }
    }

    // == Invalidate ==
    /// Deletes the local entries for `name`, then purges the edge.
    pub async fn invalidate(&self, name: &str, scope: &EdgeScope) -> InvalidationReport {
        let local = self.target.invalidate(name).await;
        let local_cleared = local.is_cleared();
        if !local_cleared {
            warn!(namespace = %self.cache.namespace(), name, "Local cache entry could not be removed");
        }

        let mut purges = Vec::new();
        if let Some(accelerator) = &self.accelerator {
            for target in self.plan(scope) {
                let accepted = accelerator.purge(&target).await;
                purges.push(PurgeOutcome { target, accepted });
            }
        }

        let report = InvalidationReport {
            name: name.to_string(),
            local,
            local_cleared,
            purges,
        };
        info!(
            namespace = %self.cache.namespace(),
            name,
            local = ?local,
            purges = report.purges.len(),
            accelerator_ok = report.accelerator_ok(),
            "Invalidation complete"
        );
        report
    }

    pub async fn invalidate_url(&self, name: &str, url: &str) -> InvalidationReport {
        self.invalidate(name, &EdgeScope::url(url)).await
    }

    pub async fn invalidate_pattern(&self, name: &str, pattern: &str) -> InvalidationReport {
        self.invalidate(name, &EdgeScope::pattern(pattern)).await
    }

    /// Full accelerator flush. `None` when no accelerator is configured.
    pub async fn flush_all(&self) -> Option<bool> {
        match &self.accelerator {
            Some(accelerator) => Some(accelerator.delete_all().await),
            None => None,
        }
    }
}
