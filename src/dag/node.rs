//! Node types stored in the DAG

use crate::types::Hash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification of a decoded node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Directory,
    File,
    Raw,
    Symlink,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Directory => "directory",
            NodeKind::File => "file",
            NodeKind::Raw => "raw",
            NodeKind::Symlink => "symlink",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named or positional reference to another node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub hash: Hash,
    /// Content bytes reachable through this link
    pub size: u64,
    pub kind: NodeKind,
}

/// An immutable DAG node
///
/// Directory links live in a `BTreeMap` so the encoding is independent of
/// the order entries were added in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DagNode {
    Directory { links: BTreeMap<String, Link> },
    File { leaves: Vec<Link>, size: u64 },
    Raw(Vec<u8>),
    Symlink(String),
}

impl DagNode {
    pub fn empty_directory() -> Self {
        DagNode::Directory {
            links: BTreeMap::new(),
        }
    }

    pub fn empty_file() -> Self {
        DagNode::File {
            leaves: Vec::new(),
            size: 0,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            DagNode::Directory { .. } => NodeKind::Directory,
            DagNode::File { .. } => NodeKind::File,
            DagNode::Raw(_) => NodeKind::Raw,
            DagNode::Symlink(_) => NodeKind::Symlink,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, DagNode::Directory { .. })
    }

    /// Content size derived from node metadata.
    ///
    /// For directories this is the sum of the linked sizes.
    pub fn content_size(&self) -> u64 {
        match self {
            DagNode::Directory { links } => links.values().map(|l| l.size).sum(),
            DagNode::File { size, .. } => *size,
            DagNode::Raw(data) => data.len() as u64,
            DagNode::Symlink(target) => target.len() as u64,
        }
    }

    /// Build the link a parent stores for this node.
    pub fn link(&self, hash: Hash) -> Link {
        Link {
            hash,
            size: self.content_size(),
            kind: self.kind(),
        }
    }
}
