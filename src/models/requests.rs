//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::invalidation::EdgeScope;

/// Request body for POST /invalidate
///
/// # Fields
/// - `namespace`: Cache type holding the artifact
/// - `name`: Logical artifact name
/// - `urls`: Exact URLs serving the artifact (optional)
/// - `pattern`: Accelerator ban pattern (optional)
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub pattern: Option<String>,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.namespace.trim().is_empty() {
            return Some("Namespace cannot be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Some("Name cannot be empty".to_string());
        }
        if self.urls.iter().any(|u| u.trim().is_empty()) {
            return Some("URLs cannot be empty".to_string());
        }
        if matches!(&self.pattern, Some(p) if p.trim().is_empty()) {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }

    /// Accelerator scope described by this request.
    pub fn scope(&self) -> EdgeScope {
        EdgeScope {
            urls: self.urls.clone(),
            pattern: self.pattern.clone(),
        }
    }
}
