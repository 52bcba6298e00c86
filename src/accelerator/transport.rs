//! Purge Transport
//!
//! The HTTP leg of accelerator invalidation. The accelerator decides what
//! to send; the transport only delivers it and reports the status code.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};

use super::PurgeRequest;
use crate::error::{CacheError, Result};

/// Delivers purge requests to the accelerator.
#[async_trait]
pub trait PurgeTransport: Send + Sync + fmt::Debug {
    /// Sends `request` and returns the response status code.
    ///
    /// Fails with `CacheError::AcceleratorUnreachable` when no response
    /// arrives (connection refused, timeout, ...).
    async fn send(&self, request: &PurgeRequest) -> Result<u16>;
}

// == HTTP Transport ==
/// reqwest-backed transport with a bounded per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PurgeTransport for HttpTransport {
    async fn send(&self, request: &PurgeRequest) -> Result<u16> {
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| CacheError::Internal(format!("Invalid purge method: {}", e)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CacheError::AcceleratorUnreachable(format!("{}: {}", request.url, e)))?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accelerator::PurgeMethod;

    #[tokio::test]
    async fn test_unreachable_accelerator() {
        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
        // Port 9 (discard) on loopback is closed on any sane test host
        let request = PurgeRequest::new(PurgeMethod::Purge, "http://127.0.0.1:9/x");

        let result = transport.send(&request).await;
        assert!(matches!(result, Err(CacheError::AcceleratorUnreachable(_))));
    }
}
