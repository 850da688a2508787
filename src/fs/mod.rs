//! Mutable filesystem tree
//!
//! `Directory` and `File` inodes are in-memory views over immutable DAG
//! nodes. Edits produce new nodes; a flush hands the new node to the parent
//! through the `Parent` capability, one level at a time, until the `Root`
//! stores it and passes the hash to its republisher.

pub mod descriptor;
pub mod directory;
pub mod file;
pub mod root;

pub use descriptor::{FileDescriptor, OpenFlags};
pub use directory::{Directory, Entries, NodeListing};
pub use file::File;
pub use root::{Root, RootOptions, DEFAULT_CLOSE_TIMEOUT};

use crate::dag::{Chunker, DagNode};
use crate::error::FsError;
use crate::store::BlockStore;
use std::sync::{Arc, Weak};

/// A named child reporting its new immutable node
#[derive(Debug, Clone)]
pub struct ChildEntry {
    pub name: String,
    pub node: DagNode,
}

/// Anything that holds named children: a `Directory` or the `Root`.
pub trait Parent: Send + Sync {
    /// Record that the child `entry.name` now points at `entry.node`.
    ///
    /// Does not propagate further; the caller flushes the next level.
    fn update_child_entry(&self, entry: ChildEntry) -> Result<(), FsError>;
}

/// State shared by every non-root member of the tree
pub(crate) struct Inode {
    pub(crate) name: String,
    /// Non-owning back-edge; the parent owns the child, never the reverse
    pub(crate) parent: Weak<dyn Parent>,
    pub(crate) store: Arc<dyn BlockStore>,
    pub(crate) chunker: Chunker,
}

impl Inode {
    pub(crate) fn parent(&self) -> Result<Arc<dyn Parent>, FsError> {
        self.parent
            .upgrade()
            .ok_or_else(|| FsError::Detached(self.name.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    File,
    Directory,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::File => f.write_str("file"),
            NodeType::Directory => f.write_str("directory"),
        }
    }
}

/// Any child node of the tree
#[derive(Clone)]
pub enum FsNode {
    File(Arc<File>),
    Directory(Arc<Directory>),
}

impl FsNode {
    pub fn name(&self) -> &str {
        match self {
            FsNode::File(f) => f.name(),
            FsNode::Directory(d) => d.name(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            FsNode::File(_) => NodeType::File,
            FsNode::Directory(_) => NodeType::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FsNode::Directory(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FsNode::File(_))
    }

    pub fn as_dir(&self) -> Option<&Arc<Directory>> {
        match self {
            FsNode::Directory(d) => Some(d),
            FsNode::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&Arc<File>> {
        match self {
            FsNode::File(f) => Some(f),
            FsNode::Directory(_) => None,
        }
    }

    pub fn into_dir(self) -> Result<Arc<Directory>, FsError> {
        match self {
            FsNode::Directory(d) => Ok(d),
            FsNode::File(f) => Err(FsError::TypeMismatch(format!(
                "{} is a file, expected a directory",
                f.name()
            ))),
        }
    }

    pub fn into_file(self) -> Result<Arc<File>, FsError> {
        match self {
            FsNode::File(f) => Ok(f),
            FsNode::Directory(d) => Err(FsError::TypeMismatch(format!(
                "{} is a directory, expected a file",
                d.name()
            ))),
        }
    }

    /// Current node, syncing cached descendants of a directory
    pub fn get_node(&self) -> Result<DagNode, FsError> {
        match self {
            FsNode::File(f) => Ok(f.get_node()),
            FsNode::Directory(d) => d.get_node(),
        }
    }

    /// Commit this node and report it to its parent
    pub fn flush(&self) -> Result<(), FsError> {
        match self {
            FsNode::File(f) => f.flush(),
            FsNode::Directory(d) => d.flush().map(|_| ()),
        }
    }

    pub(crate) fn ptr_eq(&self, other: &FsNode) -> bool {
        match (self, other) {
            (FsNode::File(a), FsNode::File(b)) => Arc::ptr_eq(a, b),
            (FsNode::Directory(a), FsNode::Directory(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for FsNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsNode")
            .field("name", &self.name())
            .field("type", &self.node_type())
            .finish()
    }
}

/// Reject names that cannot be a single path component
pub(crate) fn check_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FsError::InvalidPath(format!("invalid entry name {:?}", name)));
    }
    Ok(())
}
