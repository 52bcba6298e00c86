//! Volatile Driver
//!
//! In-process map; contents live only as long as the process.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::StorageDriver;
use crate::cache::entry::{epoch, CacheEntry};
use crate::config::DriverKind;
use crate::error::{CacheError, Result};

// == Volatile Driver ==
/// HashMap-backed store guarded by an async RwLock.
#[derive(Debug, Default)]
pub struct VolatileDriver {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl VolatileDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StorageDriver for VolatileDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Volatile
    }

    async fn get(&self, key: &str) -> Result<String> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.content.clone())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn store(&self, key: &str, content: &str) -> bool {
        // Entry is built before taking the lock; the swap is a single insert
        let entry = CacheEntry::new(content.to_string());
        self.entries.write().await.insert(key.to_string(), entry);
        true
    }

    async fn last_modified(&self, key: &str) -> DateTime<Utc> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.last_modified)
            .unwrap_or_else(epoch)
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key);
        true
    }
}
