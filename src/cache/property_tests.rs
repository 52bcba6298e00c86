//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the storage and key-derivation contracts across
//! both backends.

use proptest::prelude::*;
use std::sync::Arc;

use crate::cache::{
    Cacheable, KeyBuilder, PersistentDriver, RootDirResolver, StorageDriver, VolatileDriver,
};
use crate::config::CacheConfiguration;
use crate::error::CacheError;

// == Strategies ==
/// Generates cache keys, including separators that must be encoded on disk
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:./-]{1,64}".prop_map(|s| s)
}

fn content_strategy() -> impl Strategy<Value = String> {
    ".{0,256}".prop_map(|s| s)
}

fn inputs_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,8}\\.(css|js)", 0..8)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Both backends, the persistent one rooted in a fresh temp directory.
fn drivers() -> (tempfile::TempDir, Vec<Arc<dyn StorageDriver>>) {
    let dir = tempfile::tempdir().unwrap();
    let persistent: Arc<dyn StorageDriver> = Arc::new(PersistentDriver::new(
        &RootDirResolver::new(dir.path()),
        "props",
    ));
    let volatile: Arc<dyn StorageDriver> = Arc::new(VolatileDriver::new());
    (dir, vec![persistent, volatile])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Storing the same content twice is the same as storing it once.
    #[test]
    fn prop_idempotent_store(key in key_strategy(), content in content_strategy()) {
        let rt = runtime();
        let (_dir, drivers) = drivers();
        for driver in drivers {
            let got = rt.block_on(async {
                prop_assert!(driver.store(&key, &content).await);
                prop_assert!(driver.store(&key, &content).await);
                Ok(driver.get(&key).await.unwrap())
            })?;
            prop_assert_eq!(got, content.clone());
        }
    }

    // A fresh key misses; after a store it hits with the stored content.
    #[test]
    fn prop_miss_then_hit(key in key_strategy(), content in content_strategy()) {
        let rt = runtime();
        let (_dir, drivers) = drivers();
        for driver in drivers {
            rt.block_on(async {
                prop_assert!(matches!(driver.get(&key).await, Err(CacheError::NotFound(_))));
                driver.store(&key, &content).await;
                prop_assert_eq!(driver.get(&key).await.unwrap(), content.clone());
                Ok(())
            })?;
        }
    }

    // Deleting succeeds whether or not the key exists, and leaves it absent.
    #[test]
    fn prop_delete_is_idempotent(key in key_strategy(), content in content_strategy(), populate in any::<bool>()) {
        let rt = runtime();
        let (_dir, drivers) = drivers();
        for driver in drivers {
            rt.block_on(async {
                if populate {
                    driver.store(&key, &content).await;
                }
                prop_assert!(driver.delete(&key).await);
                prop_assert!(driver.delete(&key).await);
                prop_assert!(!driver.exists(&key).await);
                Ok(())
            })?;
        }
    }

    // Distinct keys never alias each other on disk.
    #[test]
    fn prop_distinct_keys_do_not_collide(a in key_strategy(), b in key_strategy()) {
        prop_assume!(a != b);
        let rt = runtime();
        let (_dir, drivers) = drivers();
        for driver in drivers {
            rt.block_on(async {
                driver.store(&a, "first").await;
                driver.store(&b, "second").await;
                prop_assert_eq!(driver.get(&a).await.unwrap(), "first");
                Ok(())
            })?;
        }
    }

    // Same inputs, same key; any change to an input changes the key.
    #[test]
    fn prop_fingerprint_determinism(inputs in inputs_strategy(), index in any::<prop::sample::Index>()) {
        let keys = KeyBuilder::new();
        let k1 = keys.build_fingerprinted("cacheable_assets", "bundle", &inputs);
        let k2 = keys.build_fingerprinted("cacheable_assets", "bundle", &inputs);
        prop_assert_eq!(&k1, &k2);

        if !inputs.is_empty() {
            let mut changed = inputs.clone();
            let i = index.index(changed.len());
            changed[i].push('x');
            let k3 = keys.build_fingerprinted("cacheable_assets", "bundle", &changed);
            prop_assert_ne!(k1, k3);
        }
    }

    // Once populated, the generator is never consulted again.
    #[test]
    fn prop_hit_never_generates(name in "[a-z]{1,16}", content in content_strategy()) {
        let rt = runtime();
        let cache = Cacheable::new(
            CacheConfiguration::new("props"),
            Arc::new(VolatileDriver::new()),
        );
        rt.block_on(async {
            let stored = content.clone();
            cache.get_or_generate(&name, move || async move { Ok(stored) }).await.unwrap();
            let hit = cache
                .get_or_generate(&name, || async { Err(anyhow::anyhow!("generator called on hit")) })
                .await;
            prop_assert_eq!(hit.unwrap(), content.clone());
            Ok(())
        })?;
    }
}
