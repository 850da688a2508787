//! File inode

use crate::dag::{Chunker, ContentEditor, DagNode, NodeKind};
use crate::error::FsError;
use crate::fs::descriptor::{DescriptorGuard, FileDescriptor, OpenFlags};
use crate::fs::{Inode, Parent};
use crate::store::BlockStore;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// A file in the tree. Content is only read or changed through descriptors.
///
/// At most one writable descriptor, or any number of read-only ones, can
/// be open at a time. Opening blocks until that holds. A thread that opens
/// a second descriptor on a file it already writes to will deadlock.
pub struct File {
    pub(crate) inode: Inode,
    desc_lock: Arc<RwLock<()>>,
    node: RwLock<DagNode>,
}

impl File {
    pub(crate) fn new(
        name: impl Into<String>,
        node: DagNode,
        parent: Weak<dyn Parent>,
        store: Arc<dyn BlockStore>,
        chunker: Chunker,
    ) -> Arc<Self> {
        Arc::new(Self {
            inode: Inode {
                name: name.into(),
                parent,
                store,
                chunker,
            },
            desc_lock: Arc::new(RwLock::new(())),
            node: RwLock::new(node),
        })
    }

    pub fn name(&self) -> &str {
        &self.inode.name
    }

    pub fn open(self: &Arc<Self>, flags: OpenFlags) -> Result<FileDescriptor, FsError> {
        if !flags.read && !flags.write {
            return Err(FsError::Mode);
        }

        let guard = if flags.write {
            DescriptorGuard::Exclusive(self.desc_lock.write_arc())
        } else {
            DescriptorGuard::Shared(self.desc_lock.read_arc())
        };

        let node = self.get_node();
        match node.kind() {
            NodeKind::File | NodeKind::Raw => {}
            NodeKind::Symlink => {
                return Err(FsError::TypeMismatch(
                    "symlinks are not supported".to_string(),
                ))
            }
            NodeKind::Directory => {
                return Err(FsError::TypeMismatch(format!(
                    "{} holds a directory node",
                    self.inode.name
                )))
            }
        }

        let editor = ContentEditor::new(Arc::clone(&self.inode.store), self.inode.chunker, node);
        Ok(FileDescriptor::new(Arc::clone(self), flags, editor, guard))
    }

    /// Size from node metadata, without reading content
    pub fn size(&self) -> Result<u64, FsError> {
        let node = self.node.read();
        match &*node {
            DagNode::File { size, .. } => Ok(*size),
            DagNode::Raw(data) => Ok(data.len() as u64),
            other => Err(FsError::TypeMismatch(format!(
                "{} node has no file size",
                other.kind()
            ))),
        }
    }

    /// Last committed node. Does not wait for open writers.
    pub fn get_node(&self) -> DagNode {
        self.node.read().clone()
    }

    pub(crate) fn set_node(&self, node: DagNode) {
        *self.node.write() = node;
    }

    /// Wait for any writer, then report the node to the parent.
    pub fn flush(self: &Arc<Self>) -> Result<(), FsError> {
        let mut fd = self.open(OpenFlags {
            read: false,
            write: true,
            sync: true,
        })?;
        fd.close()
    }

    /// Block until no descriptor is open for writing.
    pub fn sync(&self) {
        drop(self.desc_lock.write());
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File").field("name", &self.inode.name).finish()
    }
}
