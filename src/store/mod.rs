//! Block Store
//!
//! Content-addressed storage for DAG nodes. Nodes are stored in their
//! canonical encoding under the hash of that encoding, so `put` is
//! idempotent and safe to call from many directories and files at once.

pub mod persistence;

pub use persistence::SledBlockStore;

use crate::dag::codec;
use crate::dag::DagNode;
use crate::error::StorageError;
use crate::types::Hash;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Backing store interface
pub trait BlockStore: Send + Sync {
    /// Store a node and return its content address
    fn put(&self, node: &DagNode) -> Result<Hash, StorageError>;

    /// Fetch a node by hash
    ///
    /// Returns `StorageError::NodeNotFound` for unknown hashes.
    fn get(&self, hash: &Hash) -> Result<DagNode, StorageError>;

    fn has(&self, hash: &Hash) -> Result<bool, StorageError>;
}

/// In-memory block store
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Hash, Vec<u8>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put(&self, node: &DagNode) -> Result<Hash, StorageError> {
        let (bytes, hash) = codec::encode_and_hash(node)?;
        self.blocks.write().entry(hash).or_insert(bytes);
        Ok(hash)
    }

    fn get(&self, hash: &Hash) -> Result<DagNode, StorageError> {
        let blocks = self.blocks.read();
        let bytes = blocks
            .get(hash)
            .ok_or(StorageError::NodeNotFound(*hash))?;
        codec::decode(bytes)
    }

    fn has(&self, hash: &Hash) -> Result<bool, StorageError> {
        Ok(self.blocks.read().contains_key(hash))
    }
}
