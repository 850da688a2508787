//! Persistence layer for the block store

use crate::dag::codec;
use crate::dag::DagNode;
use crate::error::StorageError;
use crate::store::BlockStore;
use crate::types::Hash;
use sled;
use std::path::Path;

const TREE_BLOCKS: &str = "blocks";
const TREE_ROOTS: &str = "roots";

/// Sled-based implementation of BlockStore
///
/// Blocks live in the `blocks` tree keyed by hash. Named root pointers,
/// written by publishers, live in the `roots` tree.
#[derive(Clone)]
pub struct SledBlockStore {
    db: sled::Db,
    blocks: sled::Tree,
    roots: sled::Tree,
}

impl SledBlockStore {
    /// Open (or create) a SledBlockStore at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| to_storage_io("open sled database", e))?;
        let blocks = db
            .open_tree(TREE_BLOCKS)
            .map_err(|e| to_storage_io("open blocks tree", e))?;
        let roots = db
            .open_tree(TREE_ROOTS)
            .map_err(|e| to_storage_io("open roots tree", e))?;
        Ok(Self { db, blocks, roots })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Record `hash` as the current value of the named root pointer
    pub fn set_root(&self, name: &str, hash: &Hash) -> Result<(), StorageError> {
        self.roots
            .insert(name.as_bytes(), hash.as_slice())
            .map_err(|e| to_storage_io("store root pointer", e))?;
        Ok(())
    }

    /// Read a named root pointer
    pub fn get_root(&self, name: &str) -> Result<Option<Hash>, StorageError> {
        let Some(raw) = self
            .roots
            .get(name.as_bytes())
            .map_err(|e| to_storage_io("read root pointer", e))?
        else {
            return Ok(None);
        };
        let hash: Hash = raw.as_ref().try_into().map_err(|_| {
            StorageError::Corrupt(format!(
                "Root pointer '{}' has length {}, expected 32",
                name,
                raw.len()
            ))
        })?;
        Ok(Some(hash))
    }

    /// Number of stored blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| to_storage_io("flush database", e))?;
        Ok(())
    }
}

impl BlockStore for SledBlockStore {
    fn put(&self, node: &DagNode) -> Result<Hash, StorageError> {
        let (bytes, hash) = codec::encode_and_hash(node)?;
        // Same hash means same bytes; an existing entry is left untouched.
        self.blocks
            .compare_and_swap(hash.as_slice(), None as Option<&[u8]>, Some(bytes))
            .map_err(|e| to_storage_io("put block", e))?
            .ok();
        Ok(hash)
    }

    fn get(&self, hash: &Hash) -> Result<DagNode, StorageError> {
        match self
            .blocks
            .get(hash.as_slice())
            .map_err(|e| to_storage_io("get block", e))?
        {
            Some(value) => codec::decode(&value),
            None => Err(StorageError::NodeNotFound(*hash)),
        }
    }

    fn has(&self, hash: &Hash) -> Result<bool, StorageError> {
        self.blocks
            .contains_key(hash.as_slice())
            .map_err(|e| to_storage_io("check block existence", e))
    }
}

fn to_storage_io(action: &str, err: sled::Error) -> StorageError {
    StorageError::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("Failed to {}: {}", action, err),
    ))
}
