// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for content fetched from IPFS gateways.
//!
//! Content is addressed by its CID and never changes, so entries carry no
//! TTL; the LRU bound alone limits memory.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Default number of cached documents.
pub const DEFAULT_CONTENT_CACHE_CAPACITY: usize = 256;

/// In-process LRU cache keyed by CID.
pub struct ContentCache {
    cache: Mutex<LruCache<String, serde_json::Value>>,
}

impl ContentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, cid: &str) -> Option<serde_json::Value> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(cid).cloned()
    }

    pub fn put(&self, cid: &str, content: serde_json::Value) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(cid.to_string(), content);
        }
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_put_and_get() {
        let cache = ContentCache::new(10);
        assert!(cache.get("bafy1").is_none());

        cache.put("bafy1", json!({"a": 1}));
        assert_eq!(cache.get("bafy1"), Some(json!({"a": 1})));
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = ContentCache::new(2);
        cache.put("one", json!(1));
        cache.put("two", json!(2));
        // Touch "one" so "two" becomes the eviction candidate
        assert!(cache.get("one").is_some());
        cache.put("three", json!(3));

        assert!(cache.get("two").is_none());
        assert!(cache.get("one").is_some());
        assert!(cache.get("three").is_some());
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache = ContentCache::new(0);
        cache.put("only", json!(true));
        assert_eq!(cache.get("only"), Some(json!(true)));
    }
}
