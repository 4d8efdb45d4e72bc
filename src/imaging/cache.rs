//! Process-wide cache of processed images.
//!
//! Created once at startup and handed (cloned) to every image worker; clones
//! share the same storage. Entries are weighed by decoded pixel memory in KiB
//! and evicted least-recently-used first once the capacity is exceeded.

use image::RgbaImage;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::transform::GALLERY_PREFIX;
use crate::config::ImagesConfig;

/// A processed, display-ready image.
pub type Picture = Arc<RgbaImage>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub decodes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    decodes: AtomicU64,
}

#[derive(Clone)]
pub struct ImageCache {
    inner: Cache<String, Picture>,
    counters: Arc<Counters>,
}

fn weight_kib(picture: &Picture) -> u32 {
    let kib = picture.as_raw().len() as u64 / 1024;
    kib.clamp(1, u64::from(u32::MAX)) as u32
}

impl ImageCache {
    pub fn new(capacity_kib: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity_kib)
            .weigher(|_key: &String, picture: &Picture| weight_kib(picture))
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self {
            inner,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn from_config(config: &ImagesConfig) -> Self {
        Self::new(config.cache_capacity_kib())
    }

    pub fn get(&self, key: &str) -> Option<Picture> {
        let found = self.inner.get(key);
        let counter = if found.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store a picture unless the key is already cached.
    pub fn insert(&self, key: String, picture: Picture) {
        if !self.inner.contains_key(&key) {
            debug!(%key, kib = weight_kib(&picture), "Caching image");
            self.inner.insert(key, picture);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.invalidate(key);
    }

    /// Drop every cached rendering of `path`, e.g. after it was re-photographed.
    pub fn invalidate_path(&self, path: &str) {
        self.invalidate(path);
        self.invalidate(&format!("{GALLERY_PREFIX}{path}"));
    }

    /// Total weight in KiB after pending evictions have run.
    pub fn weighted_size_kib(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.weighted_size()
    }

    pub fn capacity_kib(&self) -> u64 {
        self.inner.policy().max_capacity().unwrap_or(0)
    }

    pub(crate) fn record_decode(&self) {
        self.counters.decodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            decodes: self.counters.decodes.load(Ordering::Relaxed),
        }
    }
}
