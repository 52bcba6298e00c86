//! Configuration Module
//!
//! Process-level defaults for the admin daemon and per-cache-type settings
//! that are handed to each cache instance at construction time.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Identifies a storage backend implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// File-backed store; survives process restarts
    Persistent,
    /// In-process map; lives as long as the process
    Volatile,
    /// Backend registered by name in a `DriverRegistry`
    Custom(String),
}

impl FromStr for DriverKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "persistent" | "file" => DriverKind::Persistent,
            "volatile" | "memory" => DriverKind::Volatile,
            _ => DriverKind::Custom(s.trim().to_string()),
        })
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::Persistent => f.write_str("persistent"),
            DriverKind::Volatile => f.write_str("volatile"),
            DriverKind::Custom(name) => f.write_str(name),
        }
    }
}

// == Cache Configuration ==
/// Settings for one cache type (e.g. `cacheable_assets`, `templates`).
#[derive(Debug, Clone)]
pub struct CacheConfiguration {
    /// Explicit backend choice; `None` falls back to the process default
    pub driver: Option<DriverKind>,
    /// Whether entries must survive process restarts
    pub uses_persistent_store: bool,
    /// Logical partition passed to the driver and the key builder
    pub namespace: String,
    /// Whether keys embed a hash of the generator's inputs
    pub fingerprint_keyed: bool,
}

impl CacheConfiguration {
    /// Creates a non-persistent, name-keyed configuration for `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            driver: None,
            uses_persistent_store: false,
            namespace: namespace.into(),
            fingerprint_keyed: false,
        }
    }

    pub fn with_driver(mut self, driver: DriverKind) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn persistent(mut self) -> Self {
        self.uses_persistent_store = true;
        self
    }

    pub fn fingerprinted(mut self) -> Self {
        self.fingerprint_keyed = true;
        self
    }
}

// == Process Config ==
/// Process-wide defaults.
///
/// The library never reads the environment itself; only the binary calls
/// [`Config::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for the persistent driver
    pub cache_dir: PathBuf,
    /// Backend used when a cache type names none and needs no durability
    pub default_driver: DriverKind,
    /// Base URL of the reverse-proxy accelerator, if one fronts the site
    pub accelerator_url: Option<String>,
    /// Upper bound on a single purge round-trip
    pub accelerator_timeout: Duration,
    /// Admin HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Persistent driver root (default: ./var/cache)
    /// - `DEFAULT_DRIVER` - `persistent` or `volatile` (default: volatile)
    /// - `ACCELERATOR_URL` - Accelerator base URL (default: none)
    /// - `ACCELERATOR_TIMEOUT_MS` - Purge timeout in milliseconds (default: 2000)
    /// - `SERVER_PORT` - Admin HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            default_driver: env::var("DEFAULT_DRIVER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_driver),
            accelerator_url: env::var("ACCELERATOR_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            accelerator_timeout: env::var("ACCELERATOR_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.accelerator_timeout),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }

    // == Resolve Driver ==
    /// Picks the backend for a cache type.
    ///
    /// Explicit choice wins, then durability requirement, then the process default.
    pub fn resolve_driver(&self, cache: &CacheConfiguration) -> DriverKind {
        match (&cache.driver, cache.uses_persistent_store) {
            (Some(kind), _) => kind.clone(),
            (None, true) => DriverKind::Persistent,
            (None, false) => self.default_driver.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./var/cache"),
            default_driver: DriverKind::Volatile,
            accelerator_url: None,
            accelerator_timeout: Duration::from_millis(2000),
            server_port: 3000,
        }
    }
}
