//! Cache Entry Module
//!
//! Defines the in-memory representation of a stored artifact.

use chrono::{DateTime, Utc};

// == Cache Entry ==
/// A stored artifact payload with its backend-assigned timestamp.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored content
    pub content: String,
    /// Set by the backend at store time, never by the caller
    pub last_modified: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(content: String) -> Self {
        Self {
            content,
            last_modified: Utc::now(),
        }
    }
}

/// Timestamp reported for artifacts that do not exist.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let before = Utc::now();
        let entry = CacheEntry::new(".a{}".to_string());

        assert_eq!(entry.content, ".a{}");
        assert!(entry.last_modified >= before);
        assert!(entry.last_modified <= Utc::now());
    }

    #[test]
    fn test_epoch_is_zero() {
        assert_eq!(epoch().timestamp(), 0);
        assert!(CacheEntry::new(String::new()).last_modified > epoch());
    }
}
