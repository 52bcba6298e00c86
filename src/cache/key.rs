//! Key Builder Module
//!
//! Derives storage keys from a namespace, a logical name and, for
//! fingerprint-keyed caches, a SHA-256 digest of the generator's inputs.

use sha2::{Digest, Sha256};

/// Separator between key segments.
const SEPARATOR: char = ':';

/// Final segment of the key recording a name's current fingerprinted key.
const CURRENT_SEGMENT: &str = "current";

/// Hex length of a SHA-256 fingerprint.
const FINGERPRINT_LEN: usize = 64;

// == Key Builder ==
/// Stateless, deterministic key derivation.
///
/// Keys are identical across processes for identical inputs, which is what
/// lets a persistent backend be shared by several workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyBuilder;

impl KeyBuilder {
    pub fn new() -> Self {
        Self
    }

    /// `namespace:name`
    pub fn build(&self, namespace: &str, name: &str) -> String {
        format!("{namespace}{SEPARATOR}{name}")
    }

    /// `namespace:name:<sha256 of inputs>`
    ///
    /// Input order is significant. Callers that want order-insensitive keys
    /// must sort before calling.
    pub fn build_fingerprinted<S: AsRef<str>>(
        &self,
        namespace: &str,
        name: &str,
        inputs: &[S],
    ) -> String {
        format!(
            "{}{SEPARATOR}{}",
            self.build(namespace, name),
            Self::fingerprint(inputs)
        )
    }

    /// `namespace:name:current`, where a fingerprint-keyed cache records
    /// which fingerprinted key `name` currently resolves to.
    ///
    /// Never equal to a fingerprinted key, whose last segment is 64 hex digits.
    pub fn build_current(&self, namespace: &str, name: &str) -> String {
        format!("{}{SEPARATOR}{CURRENT_SEGMENT}", self.build(namespace, name))
    }

    /// True when `key` is a fingerprinted key for `name` in `namespace`.
    pub fn is_fingerprinted_for(&self, namespace: &str, name: &str, key: &str) -> bool {
        key.strip_prefix(&self.build(namespace, name))
            .and_then(|rest| rest.strip_prefix(SEPARATOR))
            .map_or(false, |fp| {
                fp.len() == FINGERPRINT_LEN && fp.bytes().all(|b| b.is_ascii_hexdigit())
            })
    }

    // == Fingerprint ==
    /// Hex-encoded SHA-256 over the ordered inputs.
    ///
    /// Each input is length-prefixed so `["ab", "c"]` and `["a", "bc"]` hash
    /// differently.
    pub fn fingerprint<S: AsRef<str>>(inputs: &[S]) -> String {
        let mut hasher = Sha256::new();
        for input in inputs {
            let bytes = input.as_ref().as_bytes();
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        hex::encode(hasher.finalize())
    }
}
