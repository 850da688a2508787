//! Canonical node encoding and hashing using bincode and BLAKE3

use crate::dag::node::DagNode;
use crate::error::StorageError;
use crate::types::Hash;
use blake3::Hasher;

/// Encode a node into its canonical byte form
pub fn encode(node: &DagNode) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(node)
        .map_err(|e| StorageError::Corrupt(format!("Failed to encode node: {}", e)))
}

/// Decode a stored block
pub fn decode(bytes: &[u8]) -> Result<DagNode, StorageError> {
    bincode::deserialize(bytes)
        .map_err(|e| StorageError::Corrupt(format!("Failed to decode node: {}", e)))
}

/// Hash of already-encoded bytes
pub fn hash_bytes(bytes: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    *hasher.finalize().as_bytes()
}

/// Compute the content address of a node
///
/// Hash = BLAKE3(encode(node)). Same node always produces the same hash.
pub fn hash_node(node: &DagNode) -> Result<Hash, StorageError> {
    Ok(hash_bytes(&encode(node)?))
}

/// Encode a node and return the bytes together with their hash
pub fn encode_and_hash(node: &DagNode) -> Result<(Vec<u8>, Hash), StorageError> {
    let bytes = encode(node)?;
    let hash = hash_bytes(&bytes);
    Ok((bytes, hash))
}
