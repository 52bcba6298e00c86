//! Asset List Cache
//!
//! Fingerprint-keyed caching of ordered CSS/JS asset lists. The fingerprint
//! is taken over the ordered asset URLs, so adding, removing or reordering
//! an asset yields a new manifest and a new bundle URL.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::cache::{Cacheable, DriverRegistry, KeyBuilder, LocalInvalidation};
use crate::config::CacheConfiguration;
use crate::error::{CacheError, Result};

/// Kind of asset a list holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Css,
    Js,
}

impl AssetKind {
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Css => "css",
            AssetKind::Js => "js",
        }
    }

    /// Storage namespace for this kind's manifests.
    pub fn namespace(self) -> &'static str {
        match self {
            AssetKind::Css => "cacheable_assets_css",
            AssetKind::Js => "cacheable_assets_js",
        }
    }

    /// Storage namespace for this kind's combined bundles.
    pub fn bundle_namespace(self) -> &'static str {
        match self {
            AssetKind::Css => "cacheable_assets_css_bundles",
            AssetKind::Js => "cacheable_assets_js_bundles",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A single stylesheet or script reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub url: String,
    /// Lower values are emitted first
    #[serde(default)]
    pub priority: i32,
    /// Extra tag attributes (`media`, `defer`, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl AssetDescriptor {
    pub fn new(url: impl Into<String>, priority: i32) -> Self {
        Self {
            url: url.into(),
            priority,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Cached result for one asset list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub kind: AssetKind,
    pub fingerprint: String,
    /// Where the combined bundle for this exact list is served
    pub bundle_url: String,
    /// Assets in emission order
    pub assets: Vec<AssetDescriptor>,
}

// == Asset List Cache ==
/// Manifests and bundles live in separate namespaces, so no manifest name
/// can resolve to a bundle's key.
#[derive(Debug, Clone)]
pub struct AssetListCache {
    kind: AssetKind,
    output_dir: String,
    manifests: Cacheable,
    bundles: Cacheable,
}

impl AssetListCache {
    /// Persistent, fingerprint-keyed manifest configuration for `kind`.
    pub fn configuration(kind: AssetKind) -> CacheConfiguration {
        CacheConfiguration::new(kind.namespace())
            .persistent()
            .fingerprinted()
    }

    /// Persistent, fingerprint-keyed bundle configuration for `kind`.
    pub fn bundle_configuration(kind: AssetKind) -> CacheConfiguration {
        CacheConfiguration::new(kind.bundle_namespace())
            .persistent()
            .fingerprinted()
    }

    pub fn new(
        kind: AssetKind,
        output_dir: impl Into<String>,
        manifests: Cacheable,
        bundles: Cacheable,
    ) -> Result<Self> {
        for cache in [&manifests, &bundles] {
            if !cache.config().fingerprint_keyed {
                return Err(CacheError::InvalidRequest(format!(
                    "Asset list cache '{}' must be fingerprint-keyed",
                    cache.namespace()
                )));
            }
        }
        if manifests.namespace() == bundles.namespace() {
            return Err(CacheError::InvalidRequest(format!(
                "Asset manifests and bundles cannot share namespace '{}'",
                manifests.namespace()
            )));
        }
        Ok(Self {
            kind,
            output_dir: output_dir.into().trim_end_matches('/').to_string(),
            manifests,
            bundles,
        })
    }

    pub fn from_registry(
        kind: AssetKind,
        output_dir: impl Into<String>,
        registry: &DriverRegistry,
    ) -> Result<Self> {
        let manifests = Cacheable::from_registry(Self::configuration(kind), registry)?;
        let bundles = Cacheable::from_registry(Self::bundle_configuration(kind), registry)?;
        Self::new(kind, output_dir, manifests, bundles)
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Manifest cache.
    pub fn cache(&self) -> &Cacheable {
        &self.manifests
    }

    pub fn bundles(&self) -> &Cacheable {
        &self.bundles
    }

    // == Ordering ==
    /// Sorts by ascending priority; ties keep insertion order.
    pub fn order(mut assets: Vec<AssetDescriptor>) -> Vec<AssetDescriptor> {
        assets.sort_by_key(|asset| asset.priority);
        assets
    }

    fn fingerprint_inputs(ordered: &[AssetDescriptor]) -> Vec<String> {
        ordered.iter().map(|asset| asset.url.clone()).collect()
    }

    // == Manifest ==
    /// Returns the manifest for `assets`, building it on a miss.
    pub async fn manifest(&self, name: &str, assets: Vec<AssetDescriptor>) -> Result<AssetManifest> {
        let ordered = Self::order(assets);
        let inputs = Self::fingerprint_inputs(&ordered);
        let fingerprint = KeyBuilder::fingerprint(&inputs);

        let manifest = AssetManifest {
            kind: self.kind,
            bundle_url: format!(
                "{}/{}.{}",
                self.output_dir,
                fingerprint,
                self.kind.extension()
            ),
            fingerprint,
            assets: ordered,
        };

        let raw = self
            .manifests
            .get_or_generate_from(name, &inputs, move || async move {
                Ok::<_, anyhow::Error>(serde_json::to_string(&manifest)?)
            })
            .await?;

        serde_json::from_str(&raw).map_err(|e| {
            CacheError::Internal(format!("Corrupt manifest cached for '{}': {}", name, e))
        })
    }

    // == Bundle ==
    /// Returns the combined (e.g. minified) text for `assets`, running
    /// `generator` on a miss. Keyed by the manifest's fingerprint.
    pub async fn bundle<F, Fut>(
        &self,
        name: &str,
        assets: Vec<AssetDescriptor>,
        generator: F,
    ) -> Result<String>
    where
        F: FnOnce(Vec<AssetDescriptor>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        let ordered = Self::order(assets);
        let inputs = Self::fingerprint_inputs(&ordered);
        self.bundles
            .get_or_generate_from(name, &inputs, move || generator(ordered))
            .await
    }

    /// Drops the current manifest and bundle for `name`.
    pub async fn invalidate(&self, name: &str) -> LocalInvalidation {
        let manifest = self.manifests.invalidate(name).await;
        let bundle = self.bundles.invalidate(name).await;
        manifest.merge(bundle)
    }
}
