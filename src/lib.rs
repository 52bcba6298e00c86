//! Artifact Cache - derived-content caching with edge invalidation
//!
//! Cache-aside storage for expensively produced artifacts (asset manifests,
//! rendered templates, minified bundles) over pluggable backends, with
//! invalidation that reaches both the local store and an HTTP reverse-proxy
//! accelerator.

pub mod accelerator;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod models;

pub use accelerator::{Accelerator, AcceleratorTarget};
pub use api::AppState;
pub use cache::{
    AssetListCache, Cacheable, DriverRegistry, KeyBuilder, LocalInvalidation, StorageDriver,
};
pub use config::{CacheConfiguration, Config, DriverKind};
pub use error::{CacheError, Result};
pub use invalidation::{
    EdgeScope, InvalidationCoordinator, InvalidationReport, InvalidationTarget,
};
