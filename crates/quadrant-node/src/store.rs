use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use quadrant_codec::{Block, Cid};
use thiserror::Error;

/// Errors returned by node stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("node {0} not found")]
    NotFound(Cid),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Content-addressed node storage.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Returns the serialized node stored under `cid`.
    async fn get(&self, cid: &Cid) -> Result<Bytes, StoreError>;

    /// Stores a batch of blocks and returns their identifiers in order.
    async fn put_many(&self, blocks: Vec<Block>) -> Result<Vec<Cid>, StoreError>;
}

#[async_trait]
impl<S: NodeStore + ?Sized> NodeStore for Arc<S> {
    async fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        (**self).get(cid).await
    }

    async fn put_many(&self, blocks: Vec<Block>) -> Result<Vec<Cid>, StoreError> {
        (**self).put_many(blocks).await
    }
}

#[async_trait]
impl<S: NodeStore + ?Sized> NodeStore for &S {
    async fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        (**self).get(cid).await
    }

    async fn put_many(&self, blocks: Vec<Block>) -> Result<Vec<Cid>, StoreError> {
        (**self).put_many(blocks).await
    }
}

/// Injected store misbehaviour, used to exercise failure paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail every read of the id with a backend error.
    Fail(String),
    /// Serve the id only after sleeping.
    Delay(Duration),
    /// Serve these bytes instead of the stored ones.
    Corrupt(Bytes),
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: Mutex<HashMap<Cid, Bytes>>,
    faults: Mutex<HashMap<Cid, Fault>>,
    gets: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store already holding `blocks`.
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let store = Self::new();
        store.insert_many(blocks);
        store
    }

    pub fn insert_many(&self, blocks: impl IntoIterator<Item = Block>) -> Vec<Cid> {
        let mut map = self.blocks.lock().expect("store lock");
        blocks
            .into_iter()
            .map(|block| {
                map.insert(block.cid, block.data);
                block.cid
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().expect("store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.blocks.lock().expect("store lock").contains_key(cid)
    }

    /// Removes a block, returning whether it was present.
    pub fn remove(&self, cid: &Cid) -> bool {
        self.blocks.lock().expect("store lock").remove(cid).is_some()
    }

    /// All stored blocks, in no particular order.
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks
            .lock()
            .expect("store lock")
            .iter()
            .map(|(cid, data)| Block {
                cid: *cid,
                data: data.clone(),
            })
            .collect()
    }

    pub fn inject_fault(&self, cid: Cid, fault: Fault) {
        self.faults.lock().expect("fault lock").insert(cid, fault);
    }

    pub fn clear_faults(&self) {
        self.faults.lock().expect("fault lock").clear();
    }

    /// Number of `get` calls served so far.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let fault = self.faults.lock().expect("fault lock").get(cid).cloned();
        match fault {
            Some(Fault::Fail(reason)) => return Err(StoreError::Backend(reason)),
            Some(Fault::Delay(delay)) => tokio::time::sleep(delay).await,
            Some(Fault::Corrupt(bytes)) => return Ok(bytes),
            None => {}
        }
        self.blocks
            .lock()
            .expect("store lock")
            .get(cid)
            .cloned()
            .ok_or(StoreError::NotFound(*cid))
    }

    async fn put_many(&self, blocks: Vec<Block>) -> Result<Vec<Cid>, StoreError> {
        Ok(self.insert_many(blocks))
    }
}
