//! Bounded article cache.
//!
//! Advisory LRU keyed by URL: it is never authoritative and is safe to
//! drop at any point. Its one behavioral role is the stale-fallback path
//! in [`crate::reader`], where a previously extracted article beats an
//! empty error page when a re-fetch fails.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::extract::ExtractedArticle;

/// Default number of cached articles.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Size-bounded URL → article cache, safe to share across threads.
#[derive(Debug)]
pub struct ArticleCache {
    entries: Mutex<LruCache<String, ExtractedArticle>>,
}

impl ArticleCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap());
        Self { entries: Mutex::new(LruCache::new(capacity)) }
    }

    /// Look up a cached article, refreshing its recency.
    pub fn get(&self, url: &str) -> Option<ExtractedArticle> {
        let mut entries = self.entries.lock().ok()?;
        entries.get(url).cloned()
    }

    /// Store an extracted article, evicting the least recently used entry
    /// when full.
    pub fn put(&self, url: &str, article: ExtractedArticle) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(url.to_string(), article);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ArticleCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
