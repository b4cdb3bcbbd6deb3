//! Fingerprint cache seam.

use dashmap::DashMap;

use folderprof_core::{CacheKey, Fingerprint};

/// Storage consulted before a file is fingerprinted.
///
/// Keys carry the path, size and modification time; any change to one of
/// them is a miss. Entries are only valid for the configuration that
/// produced them, so callers keep one cache per configuration.
pub trait FingerprintCache: Send + Sync {
    /// Look up a previously stored fingerprint.
    fn get(&self, key: &CacheKey) -> Option<Fingerprint>;

    /// Store a freshly computed fingerprint.
    fn put(&self, key: CacheKey, fingerprint: Fingerprint);
}

/// Concurrent in-process cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, Fingerprint>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl FingerprintCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Fingerprint> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, key: CacheKey, fingerprint: Fingerprint) {
        self.entries.insert(key, fingerprint);
    }
}
