//! Content-addressed DAG primitives
//!
//! Immutable nodes identified by the BLAKE3 hash of their canonical
//! encoding. Directories link to children by name; files link to raw
//! content leaves produced by the chunker.

pub mod chunker;
pub mod codec;
pub mod node;

pub use chunker::{Chunker, ContentEditor, DEFAULT_CHUNK_SIZE};
pub use codec::{decode, encode, hash_node};
pub use node::{DagNode, Link, NodeKind};
