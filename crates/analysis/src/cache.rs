//! Time-bounded cache of finished analyses.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use lru::LruCache;

use crate::request::AnalysisRequest;
use crate::result::AnalysisResult;
use crate::scene::Band;

/// Identity of a request for caching: bbox to 4 decimals (about 10 m),
/// cloud ceiling to 0.01 %.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    bbox: [i64; 4],
    start: NaiveDate,
    end: NaiveDate,
    max_cloud: i64,
    bands: Vec<Band>,
}

impl CacheKey {
    pub fn new(request: &AnalysisRequest, bands: &[Band]) -> Self {
        let mut bands = bands.to_vec();
        bands.sort();
        bands.dedup();
        Self {
            bbox: request.bbox().rounded(4),
            start: request.dates().start(),
            end: request.dates().end(),
            max_cloud: (request.max_cloud_cover() * 100.0).round() as i64,
            bands,
        }
    }
}

struct Entry {
    stored: Instant,
    result: Arc<AnalysisResult>,
}

/// LRU cache of results that expire `ttl` after insertion.
pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<LruCache<CacheKey, Entry>>,
}

impl ResultCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached result, unless absent or expired. Expired entries are
    /// dropped.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<AnalysisResult>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let (fresh, result) = entries
            .get(key)
            .map(|e| (e.stored.elapsed() < self.ttl, Arc::clone(&e.result)))?;
        if fresh {
            Some(result)
        } else {
            entries.pop(key);
            None
        }
    }

    pub fn insert(&self, key: CacheKey, result: Arc<AnalysisResult>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.put(
            key,
            Entry {
                stored: Instant::now(),
                result,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
