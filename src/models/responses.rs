//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::CacheStats;

/// Statistics for one cache type
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceStats {
    /// Backend serving this cache type
    pub driver: String,
    pub fingerprint_keyed: bool,
    #[serde(flatten)]
    pub counters: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl NamespaceStats {
    pub fn new(driver: impl Into<String>, fingerprint_keyed: bool, counters: CacheStats) -> Self {
        Self {
            driver: driver.into(),
            fingerprint_keyed,
            hit_rate: counters.hit_rate(),
            counters,
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsResponse {
    /// Per-namespace statistics
    pub caches: BTreeMap<String, NamespaceStats>,
}

/// Response body for POST /flush
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    /// Whether the accelerator accepted the full flush
    pub flushed: bool,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_stats_flattens_counters() {
        let mut counters = CacheStats::new();
        counters.record_hit();
        counters.record_miss();
        let stats = NamespaceStats::new("volatile", false, counters);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["driver"], "volatile");
        assert_eq!(json["hits"], 1);
        assert_eq!(json["misses"], 1);
        assert_eq!(json["hit_rate"], 0.5);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
