//! File content chunking and random-access editing
//!
//! File content is a `Raw` node or a `File` node whose leaves are `Raw`
//! chunks. `ContentEditor` gives a descriptor a seekable cursor over that
//! content; mutations are copy-on-write and become a new root node on
//! `commit`.

use crate::dag::node::DagNode;
use crate::error::StorageError;
use crate::store::BlockStore;
use std::io::SeekFrom;
use std::sync::Arc;

pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Fixed-size splitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    pub chunk_size: usize,
    /// Store single-chunk content directly as a `Raw` root
    pub raw_leaves: bool,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            raw_leaves: true,
        }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, raw_leaves: bool) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            raw_leaves,
        }
    }

    /// Split `data` into stored leaves and return the root node.
    ///
    /// The root itself is not stored; whoever links it does that.
    pub fn split(&self, store: &dyn BlockStore, data: &[u8]) -> Result<DagNode, StorageError> {
        let chunk_size = self.chunk_size.max(1);
        if self.raw_leaves && data.len() <= chunk_size {
            return Ok(DagNode::Raw(data.to_vec()));
        }

        let mut leaves = Vec::with_capacity(data.len() / chunk_size + 1);
        for chunk in data.chunks(chunk_size) {
            let leaf = DagNode::Raw(chunk.to_vec());
            let hash = store.put(&leaf)?;
            leaves.push(leaf.link(hash));
        }

        Ok(DagNode::File {
            leaves,
            size: data.len() as u64,
        })
    }
}

/// Read the complete byte content of a file node
pub fn read_all(store: &dyn BlockStore, node: &DagNode) -> Result<Vec<u8>, StorageError> {
    match node {
        DagNode::Raw(data) => Ok(data.clone()),
        DagNode::File { leaves, size } => {
            let mut out = Vec::with_capacity(*size as usize);
            for leaf in leaves {
                let child = store.get(&leaf.hash)?;
                out.extend_from_slice(&read_all(store, &child)?);
            }
            Ok(out)
        }
        other => Err(StorageError::Corrupt(format!(
            "{} node does not hold file content",
            other.kind()
        ))),
    }
}

/// Random-access cursor over one file's content
pub struct ContentEditor {
    store: Arc<dyn BlockStore>,
    chunker: Chunker,
    base: DagNode,
    /// Materialised content, present once the content has been mutated
    buffer: Option<Vec<u8>>,
    modified: bool,
    cursor: u64,
}

impl ContentEditor {
    pub fn new(store: Arc<dyn BlockStore>, chunker: Chunker, base: DagNode) -> Self {
        Self {
            store,
            chunker,
            base,
            buffer: None,
            modified: false,
            cursor: 0,
        }
    }

    pub fn size(&self) -> u64 {
        match &self.buffer {
            Some(data) => data.len() as u64,
            None => self.base.content_size(),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Read from the cursor, advancing it
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let n = self.read_at(buf, self.cursor)?;
        self.cursor += n as u64;
        Ok(n)
    }

    /// Read at an absolute offset without moving the cursor
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, StorageError> {
        if let Some(data) = &self.buffer {
            return Ok(copy_from(data, offset, buf));
        }

        match &self.base {
            DagNode::Raw(data) => Ok(copy_from(data, offset, buf)),
            DagNode::File { leaves, .. } => {
                let mut copied = 0usize;
                let mut leaf_start = 0u64;
                for leaf in leaves {
                    if copied == buf.len() {
                        break;
                    }
                    let leaf_end = leaf_start + leaf.size;
                    let want = offset + copied as u64;
                    if leaf_end <= want {
                        leaf_start = leaf_end;
                        continue;
                    }
                    let node = self.store.get(&leaf.hash)?;
                    let data = read_all(self.store.as_ref(), &node)?;
                    copied += copy_from(&data, want - leaf_start, &mut buf[copied..]);
                    leaf_start = leaf_end;
                }
                Ok(copied)
            }
            other => Err(StorageError::Corrupt(format!(
                "{} node does not hold file content",
                other.kind()
            ))),
        }
    }

    /// Write at the cursor, advancing it
    pub fn write(&mut self, data: &[u8]) -> Result<usize, StorageError> {
        let n = self.write_at(data, self.cursor)?;
        self.cursor += n as u64;
        Ok(n)
    }

    /// Write at an absolute offset. A gap past the end is zero-filled.
    pub fn write_at(&mut self, data: &[u8], offset: u64) -> Result<usize, StorageError> {
        let start = usize::try_from(offset)
            .map_err(|_| out_of_range("write offset exceeds addressable size"))?;
        let end = start
            .checked_add(data.len())
            .ok_or_else(|| out_of_range("write end exceeds addressable size"))?;
        let buffer = self.materialise()?;
        grow_to(buffer, end)?;
        buffer[start..end].copy_from_slice(data);
        self.modified = true;
        Ok(data.len())
    }

    pub fn truncate(&mut self, size: u64) -> Result<(), StorageError> {
        let size = usize::try_from(size)
            .map_err(|_| out_of_range("truncate size exceeds addressable size"))?;
        let buffer = self.materialise()?;
        grow_to(buffer, size)?;
        buffer.truncate(size);
        self.modified = true;
        Ok(())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, StorageError> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.cursor.checked_add_signed(delta),
            SeekFrom::End(delta) => self.size().checked_add_signed(delta),
        };
        let target =
            target.ok_or_else(|| out_of_range("seek to a negative or overflowing position"))?;
        self.cursor = target;
        Ok(target)
    }

    /// Produce the current root node, storing new leaves if modified
    pub fn commit(&mut self) -> Result<DagNode, StorageError> {
        if self.modified {
            let data = self.buffer.as_deref().unwrap_or_default();
            self.base = self.chunker.split(self.store.as_ref(), data)?;
            self.modified = false;
        }
        Ok(self.base.clone())
    }

    fn materialise(&mut self) -> Result<&mut Vec<u8>, StorageError> {
        if self.buffer.is_none() {
            self.buffer = Some(read_all(self.store.as_ref(), &self.base)?);
        }
        Ok(self.buffer.get_or_insert_with(Vec::new))
    }
}

fn out_of_range(msg: &str) -> StorageError {
    StorageError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg))
}

/// Zero-extend `buffer` to at least `len` bytes, failing instead of aborting
/// when the allocation cannot be made.
fn grow_to(buffer: &mut Vec<u8>, len: usize) -> Result<(), StorageError> {
    if buffer.len() < len {
        buffer
            .try_reserve_exact(len - buffer.len())
            .map_err(|e| out_of_range(&format!("cannot grow content to {} bytes: {}", len, e)))?;
        buffer.resize(len, 0);
    }
    Ok(())
}

fn copy_from(data: &[u8], offset: u64, buf: &mut [u8]) -> usize {
    if offset >= data.len() as u64 {
        return 0;
    }
    let start = offset as usize;
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}
