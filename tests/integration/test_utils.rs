//! Shared test utilities for integration tests
//!
//! Counting and failing store wrappers, scripted publishers and root
//! constructors.

use async_trait::async_trait;
use dagfs::error::{PublishError, StorageError};
use dagfs::republisher::{Publisher, RepublishTimeouts};
use dagfs::store::{BlockStore, MemoryBlockStore};
use dagfs::telemetry::PublishObserver;
use dagfs::types::Hash;
use dagfs::{DagNode, Root, RootOptions};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Block store that counts calls to the wrapped memory store
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryBlockStore,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.puts.store(0, Ordering::SeqCst);
    }
}

impl BlockStore for CountingStore {
    fn put(&self, node: &DagNode) -> Result<Hash, StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(node)
    }

    fn get(&self, hash: &Hash) -> Result<DagNode, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(hash)
    }

    fn has(&self, hash: &Hash) -> Result<bool, StorageError> {
        self.inner.has(hash)
    }
}

/// Block store whose writes can be switched to fail
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryBlockStore,
    fail_puts: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

impl BlockStore for FaultyStore {
    fn put(&self, node: &DagNode) -> Result<Hash, StorageError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.put(node)
    }

    fn get(&self, hash: &Hash) -> Result<DagNode, StorageError> {
        self.inner.get(hash)
    }

    fn has(&self, hash: &Hash) -> Result<bool, StorageError> {
        self.inner.has(hash)
    }
}

/// Publisher that records every attempt and fails a scripted number of times
#[derive(Default)]
pub struct ScriptedPublisher {
    failures_left: AtomicUsize,
    /// Never completes when set
    hang: bool,
    attempts: Mutex<Vec<(Hash, Instant)>>,
    published: Mutex<Vec<Hash>>,
}

impl ScriptedPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(times: usize) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicUsize::new(times),
            ..Self::default()
        })
    }

    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            hang: true,
            ..Self::default()
        })
    }

    pub fn attempts(&self) -> Vec<Hash> {
        self.attempts.lock().iter().map(|(hash, _)| *hash).collect()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().iter().map(|(_, at)| *at).collect()
    }

    pub fn published(&self) -> Vec<Hash> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    async fn publish(&self, hash: Hash) -> Result<(), PublishError> {
        self.attempts.lock().push((hash, Instant::now()));
        if self.hang {
            std::future::pending::<()>().await;
        }
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(PublishError::new("sink unavailable"));
        }
        self.published.lock().push(hash);
        Ok(())
    }
}

pub fn timeouts() -> RepublishTimeouts {
    RepublishTimeouts {
        short: Duration::from_millis(300),
        long: Duration::from_secs(3),
    }
}

pub fn options(observer: Arc<dyn PublishObserver>) -> RootOptions {
    RootOptions {
        timeouts: timeouts(),
        observer,
        ..RootOptions::default()
    }
}

/// Empty root over a fresh counting store, without a publisher
pub fn memory_root() -> (Arc<CountingStore>, Arc<Root>) {
    let store = CountingStore::new();
    let root = Root::new(store.clone(), DagNode::empty_directory(), None).unwrap();
    (store, root)
}

/// Distinct hash for the given seed
pub fn hash_of(seed: u8) -> Hash {
    [seed; 32]
}
