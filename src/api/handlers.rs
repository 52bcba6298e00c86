//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, Json};

use crate::accelerator::Accelerator;
use crate::cache::{AssetKind, AssetListCache, Cacheable, DriverRegistry};
use crate::config::{CacheConfiguration, Config};
use crate::error::{CacheError, Result};
use crate::invalidation::{InvalidationCoordinator, InvalidationReport};
use crate::models::{
    FlushResponse, HealthResponse, InvalidateRequest, NamespaceStats, StatsResponse,
};

/// Application state shared across all handlers.
///
/// One invalidation coordinator per cache namespace, plus the accelerator
/// used for full flushes.
#[derive(Clone)]
pub struct AppState {
    /// Coordinators keyed by namespace
    pub coordinators: Arc<BTreeMap<String, InvalidationCoordinator>>,
    /// Shared accelerator, if the site is fronted by one
    pub accelerator: Option<Accelerator>,
}

impl AppState {
    /// Creates a new AppState from coordinators; namespaces come from their caches.
    pub fn new(coordinators: Vec<InvalidationCoordinator>, accelerator: Option<Accelerator>) -> Self {
        let coordinators = coordinators
            .into_iter()
            .map(|c| (c.cache().namespace().to_string(), c))
            .collect();
        Self {
            coordinators: Arc::new(coordinators),
            accelerator,
        }
    }

    /// Creates the standard cache set from configuration.
    ///
    /// CSS and JS asset lists and rendered templates, all on the persistent
    /// backend: the daemon runs in its own process and only reaches entries
    /// the application processes share with it through `cache_dir`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = DriverRegistry::new(config.clone());
        let accelerator = Accelerator::from_config(config)?;

        let css = AssetListCache::from_registry(AssetKind::Css, "/assets/css", &registry)?;
        let js = AssetListCache::from_registry(AssetKind::Js, "/assets/js", &registry)?;
        let templates = Cacheable::from_registry(
            CacheConfiguration::new("templates").persistent(),
            &registry,
        )?;

        let coordinators = vec![
            InvalidationCoordinator::for_assets(css, accelerator.clone()),
            InvalidationCoordinator::for_assets(js, accelerator.clone()),
            InvalidationCoordinator::new(templates, accelerator.clone()),
        ];
        Ok(Self::new(coordinators, accelerator))
    }
}

/// Handler for POST /invalidate
///
/// Clears an artifact locally and purges the accelerator. Accelerator
/// failures are reported in the body, not as an error status.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidationReport>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let coordinator = state
        .coordinators
        .get(&req.namespace)
        .ok_or_else(|| CacheError::NotFound(format!("namespace '{}'", req.namespace)))?;

    let report = coordinator.invalidate(&req.name, &req.scope()).await;
    Ok(Json(report))
}

/// Handler for POST /flush
///
/// Full accelerator flush.
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    let accelerator = state
        .accelerator
        .as_ref()
        .ok_or_else(|| CacheError::InvalidRequest("No accelerator configured".to_string()))?;

    Ok(Json(FlushResponse {
        flushed: accelerator.delete_all().await,
    }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let mut response = StatsResponse::default();
    for (namespace, coordinator) in state.coordinators.iter() {
        let cache = coordinator.cache();
        response.caches.insert(
            namespace.clone(),
            NamespaceStats::new(
                cache.driver().kind().to_string(),
                cache.config().fingerprint_keyed,
                cache.stats().await,
            ),
        );
    }
    Json(response)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
