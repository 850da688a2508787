//! dagfs: a mutable filesystem over an immutable Merkle DAG
//!
//! Files and directories are edited in place through an in-memory tree of
//! inodes. Flushing turns the edits into new content-addressed nodes, one
//! level at a time up to the root, and a debounced republisher advertises
//! the resulting root hash to an external sink.

pub mod cli;
pub mod config;
pub mod dag;
pub mod error;
pub mod fs;
pub mod logging;
pub mod ops;
pub mod republisher;
pub mod store;
pub mod telemetry;
pub mod types;

pub use dag::DagNode;
pub use error::{FsError, RepublishError, StorageError};
pub use fs::{Directory, File, FileDescriptor, FsNode, OpenFlags, Root, RootOptions};
pub use republisher::{Publisher, RepublishTimeouts, Republisher};
pub use store::{BlockStore, MemoryBlockStore, SledBlockStore};
