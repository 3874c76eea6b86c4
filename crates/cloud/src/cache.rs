//! Decoded-tile cache for one COG reader.
//!
//! Only the first IFD is ever read, so tiles are keyed by their index in
//! that IFD. Entries are shared with in-flight reads through `Arc`, so an
//! eviction never invalidates a window being assembled.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Decompressed, predictor-decoded tile bytes.
pub type TileBytes = Arc<Vec<u8>>;

/// LRU of decoded tiles with hit/miss accounting.
pub struct TileCache {
    inner: LruCache<usize, TileBytes>,
    hits: u64,
    misses: u64,
}

impl TileCache {
    /// Capacity in tiles; zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(cap),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a tile, counting the hit or miss.
    pub fn get(&mut self, tile_idx: usize) -> Option<TileBytes> {
        match self.inner.get(&tile_idx) {
            Some(bytes) => {
                self.hits += 1;
                Some(Arc::clone(bytes))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, tile_idx: usize, bytes: TileBytes) {
        self.inner.put(tile_idx, bytes);
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
