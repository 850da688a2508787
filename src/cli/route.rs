//! CLI route: single route table and run context.
//!
//! Every command opens the root from the store's root pointer, runs one
//! operation, flushes, and closes the root so the new hash is published
//! back to the pointer.

use crate::cli::parse::Commands;
use crate::cli::presentation::{format_listing, format_stat};
use crate::config::{ConfigLoader, DagfsConfig};
use crate::dag::{codec, DagNode};
use crate::error::{CliError, PublishError};
use crate::fs::{FsNode, NodeListing, NodeType, OpenFlags, Root};
use crate::ops::{self, MkdirOptions};
use crate::republisher::Publisher;
use crate::store::{BlockStore, SledBlockStore};
use crate::telemetry::TracingObserver;
use crate::types::{hash_hex, Hash};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Name of the root pointer in the store's `roots` tree
pub const ROOT_POINTER: &str = "root";

/// Runtime context for CLI execution: configuration, store and runtime.
pub struct RunContext {
    config: DagfsConfig,
    store: SledBlockStore,
    store_path: PathBuf,
    runtime: tokio::runtime::Runtime,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        store_override: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Self::with_config(config, store_override)
    }

    pub fn with_config(
        config: DagfsConfig,
        store_override: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        config.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            CliError::Validation(msgs.join("\n"))
        })?;

        let store_path = store_override.unwrap_or_else(|| config.storage.resolve_store_path());
        std::fs::create_dir_all(&store_path)?;
        let store = SledBlockStore::new(&store_path)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_time()
            .build()?;

        debug!(store = %store_path.display(), "CLI context initialized");
        Ok(Self {
            config,
            store,
            store_path,
            runtime,
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, CliError> {
        self.runtime.block_on(self.route(command))
    }

    async fn route(&self, command: &Commands) -> Result<String, CliError> {
        match command {
            Commands::Init => self.init(),
            Commands::Root => match self.store.get_root(ROOT_POINTER)? {
                Some(hash) => Ok(hash_hex(&hash)),
                None => Err(CliError::NotInitialized),
            },
            Commands::Ls { path } => {
                let root = self.open_root()?;
                let out = match ops::lookup(&root, path)? {
                    FsNode::Directory(dir) => format_listing(&dir.list()),
                    FsNode::File(file) => {
                        let node = file.get_node();
                        format_listing(&[NodeListing {
                            name: file.name().to_string(),
                            node_type: NodeType::File,
                            size: node.content_size(),
                            hash: codec::hash_node(&node)?,
                        }])
                    }
                };
                root.close().await?;
                Ok(out)
            }
            Commands::Mkdir { path, parents } => {
                let root = self.open_root()?;
                ops::mkdir(
                    &root,
                    path,
                    MkdirOptions {
                        create_parents: *parents,
                        flush: true,
                    },
                )?;
                let hash = root.close().await?;
                Ok(format!("created {}\nroot {}", path, hash_hex(&hash)))
            }
            Commands::Write { path, file } => {
                let data = read_input(file.as_deref())?;
                let root = self.open_root()?;
                let target = match ops::lookup(&root, path) {
                    Ok(node) => node.into_file()?,
                    Err(e) if e.is_not_found() => {
                        ops::put_node(&root, path, DagNode::empty_file())?;
                        ops::lookup(&root, path)?.into_file()?
                    }
                    Err(e) => return Err(e.into()),
                };

                let mut fd = target.open(OpenFlags::write_only())?;
                fd.truncate(0)?;
                fd.write(&data)?;
                fd.close()?;

                ops::flush_path(&root, path).await?;
                let hash = root.close().await?;
                Ok(format!(
                    "wrote {} bytes to {}\nroot {}",
                    data.len(),
                    path,
                    hash_hex(&hash)
                ))
            }
            Commands::Cat { path } => {
                let root = self.open_root()?;
                let mut fd = ops::lookup(&root, path)?
                    .into_file()?
                    .open(OpenFlags::read_only())?;
                let data = fd.read_to_end()?;
                fd.close()?;
                root.close().await?;
                Ok(String::from_utf8_lossy(&data).into_owned())
            }
            Commands::Mv { src, dst } => {
                let root = self.open_root()?;
                ops::mv(&root, src, dst)?;
                ops::flush_path(&root, "/").await?;
                let hash = root.close().await?;
                Ok(format!("moved {} -> {}\nroot {}", src, dst, hash_hex(&hash)))
            }
            Commands::Rm { path } => {
                let root = self.open_root()?;
                ops::remove(&root, path)?;
                ops::flush_path(&root, "/").await?;
                let hash = root.close().await?;
                Ok(format!("removed {}\nroot {}", path, hash_hex(&hash)))
            }
            Commands::Stat { path } => {
                let root = self.open_root()?;
                let node = ops::lookup(&root, path)?;
                let dag = node.get_node()?;
                let hash = codec::hash_node(&dag)?;
                let entries = node.as_dir().map(|dir| dir.list_names().len());
                root.close().await?;
                Ok(format_stat(
                    path,
                    node.node_type(),
                    dag.content_size(),
                    &hash,
                    entries,
                ))
            }
        }
    }

    fn init(&self) -> Result<String, CliError> {
        if let Some(hash) = self.store.get_root(ROOT_POINTER)? {
            return Ok(format!(
                "already initialized at {}\nroot {}",
                self.store_path.display(),
                hash_hex(&hash)
            ));
        }
        let hash = self.store.put(&DagNode::empty_directory())?;
        self.store.set_root(ROOT_POINTER, &hash)?;
        self.store.flush()?;
        info!(store = %self.store_path.display(), "Initialized filesystem");
        Ok(format!(
            "initialized empty filesystem at {}\nroot {}",
            self.store_path.display(),
            hash_hex(&hash)
        ))
    }

    /// Open the tree at the root pointer, or an empty one if unset.
    ///
    /// Must run inside the context's runtime.
    fn open_root(&self) -> Result<Arc<Root>, CliError> {
        let node = match self.store.get_root(ROOT_POINTER)? {
            Some(hash) => self.store.get(&hash)?,
            None => DagNode::empty_directory(),
        };
        let options = self.config.root_options(Arc::new(TracingObserver));
        let store: Arc<dyn BlockStore> = Arc::new(self.store.clone());
        Ok(Root::with_options(
            store,
            node,
            Some(root_pointer_publisher(self.store.clone())),
            options,
        )?)
    }
}

/// Publisher that records each published hash as the store's root pointer
fn root_pointer_publisher(store: SledBlockStore) -> Arc<dyn Publisher> {
    Arc::new(move |hash: Hash| {
        let store = store.clone();
        async move {
            store
                .set_root(ROOT_POINTER, &hash)
                .and_then(|_| store.flush())
                .map_err(|e| PublishError::new(e.to_string()))
        }
    })
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>, CliError> {
    match file {
        Some(path) => Ok(std::fs::read(path)?),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}
