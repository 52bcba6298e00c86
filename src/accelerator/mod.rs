//! Accelerator Module
//!
//! Invalidation of an external reverse-proxy cache that sits in front of
//! the site. Three granularities are offered:
//!
//! - `PURGE <url>` - one exact cached response
//! - `BAN <base>` with `X-Ban-Pattern` - every URL matching a pattern
//! - `FULLBAN <base>` - everything
//!
//! All operations are best-effort: failures are logged and reported as
//! `false`, never raised. Stale responses at the edge expire on the
//! accelerator's own TTL.

mod transport;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{CacheError, Result};

pub use transport::{HttpTransport, PurgeTransport};

/// Header carrying the ban pattern, passed through opaquely.
pub const BAN_PATTERN_HEADER: &str = "X-Ban-Pattern";

// == Purge Method ==
/// HTTP verbs understood by the accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeMethod {
    Purge,
    Ban,
    FullBan,
}

impl PurgeMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PurgeMethod::Purge => "PURGE",
            PurgeMethod::Ban => "BAN",
            PurgeMethod::FullBan => "FULLBAN",
        }
    }
}

impl fmt::Display for PurgeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-formed purge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeRequest {
    pub method: PurgeMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl PurgeRequest {
    pub fn new(method: PurgeMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// == Accelerator Target ==
/// Address of one or more accelerator cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AcceleratorTarget {
    /// One concrete URL
    Url(String),
    /// Accelerator-defined pattern (glob/regex), passed opaquely
    Pattern(String),
    /// Every cached response
    All,
}

impl fmt::Display for AcceleratorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceleratorTarget::Url(url) => write!(f, "url {}", url),
            AcceleratorTarget::Pattern(pattern) => write!(f, "pattern {}", pattern),
            AcceleratorTarget::All => f.write_str("all"),
        }
    }
}

// == Accelerator ==
#[derive(Debug, Clone)]
pub struct Accelerator {
    base_url: String,
    transport: Arc<dyn PurgeTransport>,
}

impl Accelerator {
    /// `base_url` is the site root that receives `BAN` and `FULLBAN`.
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn PurgeTransport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    /// Builds an HTTP-backed accelerator when `config.accelerator_url` is set.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        match &config.accelerator_url {
            Some(url) => {
                let transport = HttpTransport::new(config.accelerator_timeout)?;
                Ok(Some(Self::new(url.clone(), Arc::new(transport))))
            }
            None => Ok(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Purges one exact URL.
    pub async fn delete(&self, url: &str) -> bool {
        self.report(PurgeRequest::new(PurgeMethod::Purge, url)).await
    }

    /// Bans every URL matching `pattern`.
    pub async fn delete_by_pattern(&self, pattern: &str) -> bool {
        let request = PurgeRequest::new(PurgeMethod::Ban, self.base_url.as_str())
            .with_header(BAN_PATTERN_HEADER, pattern);
        self.report(request).await
    }

    /// Flushes the whole accelerator cache.
    pub async fn delete_all(&self) -> bool {
        self.report(PurgeRequest::new(PurgeMethod::FullBan, self.base_url.as_str()))
            .await
    }

    pub async fn purge(&self, target: &AcceleratorTarget) -> bool {
        match target {
            AcceleratorTarget::Url(url) => self.delete(url).await,
            AcceleratorTarget::Pattern(pattern) => self.delete_by_pattern(pattern).await,
            AcceleratorTarget::All => self.delete_all().await,
        }
    }

    // == Dispatch ==
    /// Sends `request`; any non-2xx status is a rejection.
    pub async fn dispatch(&self, request: &PurgeRequest) -> Result<()> {
        let status = self.transport.send(request).await?;
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(CacheError::AcceleratorRejected {
                target: format!("{} {}", request.method, request.url),
                status,
            })
        }
    }

    async fn report(&self, request: PurgeRequest) -> bool {
        match self.dispatch(&request).await {
            Ok(()) => {
                info!(method = %request.method, url = %request.url, "Accelerator purge accepted");
                true
            }
            Err(e) => {
                warn!(error = %e, "Accelerator purge failed, edge may serve stale content");
                false
            }
        }
    }
}
