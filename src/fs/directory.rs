//! Directory inode
//!
//! Children are resolved lazily from the directory's links and cached as
//! live inodes. Store I/O is never performed while the directory lock is
//! held; a per-name resolve slot makes concurrent first lookups of the same
//! name fetch the block once.

use crate::dag::{Chunker, DagNode, Link, NodeKind};
use crate::error::FsError;
use crate::fs::{check_name, ChildEntry, File, FsNode, Inode, NodeType, Parent};
use crate::store::BlockStore;
use crate::types::Hash;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use tracing::debug;

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeListing {
    pub name: String,
    pub node_type: NodeType,
    pub size: u64,
    pub hash: Hash,
}

struct DirState {
    links: BTreeMap<String, Link>,
    /// Resolved children; every key is also present in `links`
    cache: HashMap<String, FsNode>,
    resolving: HashMap<String, Arc<Mutex<()>>>,
    dirty: bool,
}

pub struct Directory {
    inode: Inode,
    this: Weak<Directory>,
    state: RwLock<DirState>,
}

impl Directory {
    pub(crate) fn new(
        name: impl Into<String>,
        node: DagNode,
        parent: Weak<dyn Parent>,
        store: Arc<dyn BlockStore>,
        chunker: Chunker,
    ) -> Result<Arc<Self>, FsError> {
        let name = name.into();
        match node {
            DagNode::Directory { links } => {
                Ok(Self::from_links(name, links, parent, store, chunker))
            }
            other => Err(FsError::TypeMismatch(format!(
                "{} is a {} node, expected a directory",
                name,
                other.kind()
            ))),
        }
    }

    pub(crate) fn from_links(
        name: String,
        links: BTreeMap<String, Link>,
        parent: Weak<dyn Parent>,
        store: Arc<dyn BlockStore>,
        chunker: Chunker,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Directory {
            inode: Inode {
                name,
                parent,
                store,
                chunker,
            },
            this: this.clone(),
            state: RwLock::new(DirState {
                links,
                cache: HashMap::new(),
                resolving: HashMap::new(),
                dirty: false,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inode.name
    }

    /// True when an entry changed since the last `get_node`
    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    /// Resolve a child by name, fetching and caching it on first use.
    pub fn child(&self, name: &str) -> Result<FsNode, FsError> {
        if let Some(node) = self.state.read().cache.get(name) {
            return Ok(node.clone());
        }

        loop {
            let slot = {
                let mut state = self.state.write();
                if let Some(node) = state.cache.get(name) {
                    return Ok(node.clone());
                }
                if !state.links.contains_key(name) {
                    return Err(FsError::NotFound(name.to_string()));
                }
                Arc::clone(state.resolving.entry(name.to_string()).or_default())
            };

            let resolved = {
                let _resolving = slot.lock();
                self.resolve_locked(name)
            };

            let mut state = self.state.write();
            if state
                .resolving
                .get(name)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                state.resolving.remove(name);
            }
            drop(state);

            match resolved {
                Some(result) => return result,
                // Entry replaced while fetching; resolve the new target.
                None => continue,
            }
        }
    }

    /// Fetch and cache `name` while holding its resolve slot.
    ///
    /// Returns `None` when the link changed during the fetch.
    fn resolve_locked(&self, name: &str) -> Option<Result<FsNode, FsError>> {
        // A resolver ahead of us may have finished already.
        let link = {
            let state = self.state.read();
            if let Some(node) = state.cache.get(name) {
                return Some(Ok(node.clone()));
            }
            match state.links.get(name) {
                Some(link) => *link,
                None => return Some(Err(FsError::NotFound(name.to_string()))),
            }
        };

        let child = match self
            .inode
            .store
            .get(&link.hash)
            .map_err(FsError::from)
            .and_then(|node| self.make_child(name, node))
        {
            Ok(child) => child,
            Err(err) => return Some(Err(err)),
        };

        let mut state = self.state.write();
        if let Some(existing) = state.cache.get(name) {
            return Some(Ok(existing.clone()));
        }
        if state.links.get(name).map(|l| l.hash) != Some(link.hash) {
            return None;
        }
        state.cache.insert(name.to_string(), child.clone());
        debug!(dir = %self.inode.name, child = name, kind = %link.kind, "Resolved child");
        Some(Ok(child))
    }

    fn make_child(&self, name: &str, node: DagNode) -> Result<FsNode, FsError> {
        let parent: Weak<dyn Parent> = self.this.clone();
        match node.kind() {
            NodeKind::Directory => Ok(FsNode::Directory(Directory::new(
                name,
                node,
                parent,
                Arc::clone(&self.inode.store),
                self.inode.chunker,
            )?)),
            NodeKind::File | NodeKind::Raw | NodeKind::Symlink => Ok(FsNode::File(File::new(
                name,
                node,
                parent,
                Arc::clone(&self.inode.store),
                self.inode.chunker,
            ))),
        }
    }

    /// Link a new child. Fails with `AlreadyExists` if the name is taken.
    pub fn add_child(&self, name: &str, node: DagNode) -> Result<(), FsError> {
        check_name(name)?;
        if self.state.read().links.contains_key(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }

        let hash = self.inode.store.put(&node)?;

        let mut state = self.state.write();
        if state.links.contains_key(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        state.links.insert(name.to_string(), node.link(hash));
        state.dirty = true;
        debug!(dir = %self.inode.name, child = name, hash = %crate::types::short_hex(&hash), "Added child");
        Ok(())
    }

    /// Link `node` under `name`, replacing any existing entry.
    pub fn set_child(&self, name: &str, node: DagNode) -> Result<(), FsError> {
        check_name(name)?;
        let hash = self.inode.store.put(&node)?;

        let mut state = self.state.write();
        state.links.insert(name.to_string(), node.link(hash));
        state.cache.remove(name);
        state.dirty = true;
        Ok(())
    }

    pub fn remove_child(&self, name: &str) -> Result<(), FsError> {
        let mut state = self.state.write();
        if state.links.remove(name).is_none() {
            return Err(FsError::NotFound(name.to_string()));
        }
        state.cache.remove(name);
        state.dirty = true;
        debug!(dir = %self.inode.name, child = name, "Removed child");
        Ok(())
    }

    /// Create an empty subdirectory, or return the existing one.
    pub fn mkdir(&self, name: &str) -> Result<Arc<Directory>, FsError> {
        check_name(name)?;
        loop {
            match self.child(name) {
                Ok(FsNode::Directory(dir)) => return Ok(dir),
                Ok(FsNode::File(_)) => return Err(FsError::AlreadyExists(name.to_string())),
                Err(FsError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }

            let node = DagNode::empty_directory();
            let hash = self.inode.store.put(&node)?;

            let mut state = self.state.write();
            if state.links.contains_key(name) {
                // Lost a race with another creator; resolve what they made.
                continue;
            }
            let dir = Directory::from_links(
                name.to_string(),
                BTreeMap::new(),
                self.this.clone(),
                Arc::clone(&self.inode.store),
                self.inode.chunker,
            );
            state.links.insert(name.to_string(), node.link(hash));
            state.cache.insert(name.to_string(), FsNode::Directory(Arc::clone(&dir)));
            state.dirty = true;
            debug!(dir = %self.inode.name, child = name, "Created directory");
            return Ok(dir);
        }
    }

    /// Names of all entries, in order
    pub fn list_names(&self) -> Vec<String> {
        self.state.read().links.keys().cloned().collect()
    }

    /// Entries as of each child's last report to this directory
    pub fn list(&self) -> Vec<NodeListing> {
        self.state
            .read()
            .links
            .iter()
            .map(|(name, link)| NodeListing {
                name: name.clone(),
                node_type: match link.kind {
                    NodeKind::Directory => NodeType::Directory,
                    _ => NodeType::File,
                },
                size: link.size,
                hash: link.hash,
            })
            .collect()
    }

    /// Lazily resolve every entry. Entries removed after the call are skipped.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            dir: self,
            names: self.list_names().into_iter(),
        }
    }

    /// Sync cached children into the links and return the stored node.
    pub fn get_node(&self) -> Result<DagNode, FsError> {
        self.sync_node().map(|(node, _)| node)
    }

    fn sync_node(&self) -> Result<(DagNode, Hash), FsError> {
        let children: Vec<(String, FsNode)> = self
            .state
            .read()
            .cache
            .iter()
            .map(|(name, child)| (name.clone(), child.clone()))
            .collect();

        let mut synced = Vec::with_capacity(children.len());
        for (name, child) in children {
            let node = child.get_node()?;
            let hash = self.inode.store.put(&node)?;
            synced.push((name, child, node.link(hash)));
        }

        let node = {
            let mut state = self.state.write();
            for (name, child, link) in synced {
                // Skip entries replaced or removed while syncing.
                if state.cache.get(&name).is_some_and(|c| c.ptr_eq(&child)) {
                    state.links.insert(name, link);
                }
            }
            state.dirty = false;
            DagNode::Directory {
                links: state.links.clone(),
            }
        };

        let hash = self.inode.store.put(&node)?;
        Ok((node, hash))
    }

    /// Sync and report this directory's node to its parent.
    pub fn flush(&self) -> Result<Hash, FsError> {
        let (node, hash) = self.sync_node()?;
        let parent = self.inode.parent()?;
        parent.update_child_entry(ChildEntry {
            name: self.inode.name.clone(),
            node,
        })?;
        Ok(hash)
    }

    /// Drop resolved children. Unflushed edits below this directory are lost.
    pub(crate) fn clear_cache(&self) {
        let mut state = self.state.write();
        state.cache.clear();
        state.resolving.clear();
    }
}

impl Parent for Directory {
    fn update_child_entry(&self, entry: ChildEntry) -> Result<(), FsError> {
        let hash = self.inode.store.put(&entry.node)?;
        let mut state = self.state.write();
        if !state.links.contains_key(&entry.name) {
            return Err(FsError::Detached(entry.name));
        }
        state.links.insert(entry.name, entry.node.link(hash));
        state.dirty = true;
        Ok(())
    }
}

/// Iterator returned by [`Directory::entries`]
pub struct Entries<'a> {
    dir: &'a Directory,
    names: std::vec::IntoIter<String>,
}

impl Iterator for Entries<'_> {
    type Item = Result<(String, FsNode), FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        for name in self.names.by_ref() {
            match self.dir.child(&name) {
                Ok(node) => return Some(Ok((name, node))),
                Err(FsError::NotFound(_)) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}


impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory").field("name", &self.inode.name).finish()
    }
}
