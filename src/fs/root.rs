//! Filesystem root
//!
//! The root owns the top-level directory and, when given a publisher, a
//! `Republisher`. It is the terminal `Parent`: a child entry reported to
//! the root is stored and its hash handed to the republisher.

use crate::dag::{codec, Chunker, DagNode};
use crate::error::FsError;
use crate::fs::{ChildEntry, Directory, Parent};
use crate::republisher::{Publisher, RepublishTimeouts, Republisher};
use crate::store::BlockStore;
use crate::telemetry::{PublishObserver, TracingObserver};
use crate::types::{hash_hex, short_hex, Hash};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Tunables for a `Root`
#[derive(Clone)]
pub struct RootOptions {
    pub chunker: Chunker,
    pub timeouts: RepublishTimeouts,
    /// How long `close` waits for the final publish
    pub close_timeout: Duration,
    pub observer: Arc<dyn PublishObserver>,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            chunker: Chunker::default(),
            timeouts: RepublishTimeouts::default(),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            observer: Arc::new(TracingObserver),
        }
    }
}

impl std::fmt::Debug for RootOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootOptions")
            .field("chunker", &self.chunker)
            .field("timeouts", &self.timeouts)
            .field("close_timeout", &self.close_timeout)
            .finish_non_exhaustive()
    }
}

pub struct Root {
    dir: Arc<Directory>,
    store: Arc<dyn BlockStore>,
    repub: Option<Republisher>,
    close_timeout: Duration,
}

impl Root {
    /// Open a tree rooted at `node` with default options.
    ///
    /// With a publisher this must run inside a Tokio runtime.
    pub fn new(
        store: Arc<dyn BlockStore>,
        node: DagNode,
        publisher: Option<Arc<dyn Publisher>>,
    ) -> Result<Arc<Self>, FsError> {
        Self::with_options(store, node, publisher, RootOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn BlockStore>,
        node: DagNode,
        publisher: Option<Arc<dyn Publisher>>,
        options: RootOptions,
    ) -> Result<Arc<Self>, FsError> {
        let links = match node {
            DagNode::Directory { links } => links,
            other => {
                return Err(FsError::TypeMismatch(format!(
                    "root must be a directory, got a {} node",
                    other.kind()
                )))
            }
        };
        let hash = store.put(&DagNode::Directory {
            links: links.clone(),
        })?;

        // The starting node counts as published.
        let repub = publisher.map(|publisher| {
            Republisher::new(
                publisher,
                options.timeouts,
                Some(hash),
                Arc::clone(&options.observer),
            )
        });

        info!(
            root = %short_hex(&hash),
            entries = links.len(),
            publishing = repub.is_some(),
            "Opened root"
        );

        Ok(Arc::new_cyclic(|this: &Weak<Root>| {
            let parent: Weak<dyn Parent> = this.clone();
            Root {
                dir: Directory::from_links(
                    hash_hex(&hash),
                    links,
                    parent,
                    Arc::clone(&store),
                    options.chunker,
                ),
                store,
                repub,
                close_timeout: options.close_timeout,
            }
        }))
    }

    /// The top-level directory
    pub fn directory(&self) -> &Arc<Directory> {
        &self.dir
    }

    pub fn republisher(&self) -> Option<&Republisher> {
        self.repub.as_ref()
    }

    /// Store the current tree and hand its hash to the republisher.
    pub fn flush(&self) -> Result<Hash, FsError> {
        let node = self.dir.get_node()?;
        let hash = codec::hash_node(&node)?;
        if let Some(repub) = &self.repub {
            repub.update(hash);
        }
        debug!(root = %short_hex(&hash), "Flushed root");
        Ok(hash)
    }

    /// Flush, then drop every cached inode below the root.
    ///
    /// Open descriptors must be closed first; their later writes would be
    /// reported to detached directories.
    pub fn flush_mem_free(&self) -> Result<Hash, FsError> {
        let hash = self.flush()?;
        self.dir.clear_cache();
        Ok(hash)
    }

    /// Flush, publish the final hash (bounded by the close timeout) and stop
    /// the republisher.
    ///
    /// The republisher is stopped even when the flush fails; the flush error
    /// takes precedence over a close error.
    pub async fn close(&self) -> Result<Hash, FsError> {
        let flushed = self.flush();
        let closed = match &self.repub {
            Some(repub) => repub.close(self.close_timeout).await,
            None => Ok(()),
        };
        let hash = flushed?;
        closed?;
        info!(root = %short_hex(&hash), "Closed root");
        Ok(hash)
    }
}

impl Parent for Root {
    fn update_child_entry(&self, entry: ChildEntry) -> Result<(), FsError> {
        let hash = self.store.put(&entry.node)?;
        if let Some(repub) = &self.repub {
            repub.update(hash);
        }
        debug!(root = %short_hex(&hash), "Root updated");
        Ok(())
    }
}
