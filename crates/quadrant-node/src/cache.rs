use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use quadrant_codec::{Block, Cid};

use crate::store::{NodeStore, StoreError};

/// Read-through LRU cache in front of another store.
///
/// Nodes are immutable once written, so cached entries never go stale.
#[derive(Debug)]
pub struct CachingStore<S> {
    inner: S,
    cache: Mutex<LruCache<Cid, Bytes>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<S> CachingStore<S> {
    /// Wraps `inner`, keeping at most `capacity` nodes (minimum one).
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().expect("cache lock").len()
    }
}

#[async_trait]
impl<S: NodeStore> NodeStore for CachingStore<S> {
    async fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        let cached = self.cache.lock().expect("cache lock").get(cid).cloned();
        if let Some(bytes) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(bytes);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let bytes = self.inner.get(cid).await?;
        self.cache
            .lock()
            .expect("cache lock")
            .put(*cid, bytes.clone());
        Ok(bytes)
    }

    async fn put_many(&self, blocks: Vec<Block>) -> Result<Vec<Cid>, StoreError> {
        let cids = self.inner.put_many(blocks.clone()).await?;
        let mut cache = self.cache.lock().expect("cache lock");
        for block in blocks {
            cache.put(block.cid, block.data);
        }
        Ok(cids)
    }
}

#[cfg(test)]
mod tests {
    use quadrant_codec::{Block, TreeNode};

    use super::CachingStore;
    use crate::store::{MemoryStore, NodeStore};

    fn block(last: u8) -> Block {
        let mut share = vec![0, 0, 0, 0, 0, 0, 0, last];
        share.extend_from_slice(b"cached share");
        Block::from_node(&TreeNode::leaf_from_share(&share).expect("leaf"))
    }

    #[tokio::test]
    async fn repeated_reads_hit_the_cache() {
        let b = block(1);
        let store = CachingStore::new(MemoryStore::from_blocks([b.clone()]), 4);
        for _ in 0..3 {
            assert_eq!(store.get(&b.cid).await.expect("get"), b.data);
        }
        assert_eq!(store.misses(), 1);
        assert_eq!(store.hits(), 2);
        assert_eq!(store.inner().get_count(), 1);
    }

    #[tokio::test]
    async fn capacity_bounds_cached_entries() {
        let blocks: Vec<Block> = (0..5).map(block).collect();
        let store = CachingStore::new(MemoryStore::from_blocks(blocks.clone()), 2);
        for b in &blocks {
            store.get(&b.cid).await.expect("get");
        }
        assert_eq!(store.cached_len(), 2);
        // oldest entry was evicted and must be fetched again
        store.get(&blocks[0].cid).await.expect("get");
        assert_eq!(store.misses(), 6);
    }

    #[tokio::test]
    async fn zero_capacity_still_caches_one_entry() {
        let b = block(9);
        let store = CachingStore::new(MemoryStore::new(), 0);
        store.put_many(vec![b.clone()]).await.expect("put");
        assert_eq!(store.cached_len(), 1);
        assert_eq!(store.get(&b.cid).await.expect("get"), b.data);
        assert_eq!(store.hits(), 1);
    }
}
