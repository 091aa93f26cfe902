// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Parse cache
//
// Count-bounded LRU of demultiplexed buffers with a TTL. Keyed by content
// hash and scan mode, so identical buffers seen by different turns (or the
// same buffer re-parsed after a no-op append) are demultiplexed once.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::config::CacheConfig;
use crate::demux::Demultiplexed;
use crate::marker::ScanMode;

/// Content-based key: SHA-256 of the buffer plus the scan mode it was
/// tokenized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseKey {
    digest: [u8; 32],
    mode: ScanMode,
}

impl ParseKey {
    pub fn new(buffer: &str, mode: ScanMode) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(buffer.as_bytes()));
        Self { digest, mode }
    }
}

#[derive(Debug, Clone)]
struct CachedParse {
    channels: Demultiplexed,
    cached_at: Instant,
}

impl CachedParse {
    fn is_valid(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.cached_at) < ttl
    }
}

pub struct ParseCache {
    entries: Mutex<LruCache<ParseKey, CachedParse>>,
    ttl: Duration,
}

impl ParseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl)
    }

    /// Cached channels for `key`, if present and not expired.
    pub fn get(&self, key: &ParseKey) -> Option<Demultiplexed> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &ParseKey, now: Instant) -> Option<Demultiplexed> {
        let mut entries = self.entries.lock().ok()?;
        let valid = entries.get(key).map(|entry| entry.is_valid(self.ttl, now))?;
        if !valid {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|entry| entry.channels.clone())
    }

    pub fn insert(&self, key: ParseKey, channels: Demultiplexed) {
        self.insert_at(key, channels, Instant::now());
    }

    pub fn insert_at(&self, key: ParseKey, channels: Demultiplexed, now: Instant) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                key,
                CachedParse {
                    channels,
                    cached_at: now,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(deliverable: &str) -> Demultiplexed {
        Demultiplexed {
            deliverable: deliverable.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn hit_after_insert() {
        let cache = ParseCache::new(4, Duration::from_secs(60));
        let key = ParseKey::new("hello", ScanMode::Streaming);
        cache.insert(key, channels("hello"));
        assert_eq!(cache.get(&key).unwrap().deliverable, "hello");
    }

    #[test]
    fn key_includes_scan_mode() {
        let cache = ParseCache::new(4, Duration::from_secs(60));
        cache.insert(ParseKey::new("x", ScanMode::Streaming), channels("x"));
        assert!(cache.get(&ParseKey::new("x", ScanMode::Complete)).is_none());
        assert_ne!(
            ParseKey::new("x", ScanMode::Streaming),
            ParseKey::new("y", ScanMode::Streaming)
        );
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = ParseCache::new(4, Duration::from_secs(10));
        let key = ParseKey::new("old", ScanMode::Streaming);
        let start = Instant::now();
        cache.insert_at(key, channels("old"), start);
        assert!(cache.get_at(&key, start + Duration::from_secs(5)).is_some());
        assert!(cache.get_at(&key, start + Duration::from_secs(11)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_bounds_entries() {
        let cache = ParseCache::new(2, Duration::from_secs(60));
        for buffer in ["a", "b", "c"] {
            cache.insert(ParseKey::new(buffer, ScanMode::Streaming), channels(buffer));
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&ParseKey::new("a", ScanMode::Streaming)).is_none());
        cache.clear();
        assert!(cache.is_empty());
    }
}
