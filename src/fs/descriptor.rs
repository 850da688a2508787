//! Open-file handles

use crate::dag::ContentEditor;
use crate::error::FsError;
use crate::fs::{ChildEntry, File};
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::RawRwLock;
use std::io::SeekFrom;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a descriptor is opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    /// Report to the parent on flush and close even when nothing changed
    pub sync: bool,
}

impl OpenFlags {
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    pub fn write_only() -> Self {
        Self {
            write: true,
            ..Self::default()
        }
    }

    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            sync: false,
        }
    }

    pub fn with_sync(mut self) -> Self {
        self.sync = true;
        self
    }
}

/// Ownership of the file's descriptor lock, released on drop
pub(crate) enum DescriptorGuard {
    Shared(#[allow(dead_code)] ArcRwLockReadGuard<RawRwLock, ()>),
    Exclusive(#[allow(dead_code)] ArcRwLockWriteGuard<RawRwLock, ()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DescriptorState {
    Created,
    Dirty,
    Flushed,
    Closed,
}

/// Cursor over one open file
pub struct FileDescriptor {
    file: Arc<File>,
    flags: OpenFlags,
    editor: ContentEditor,
    state: DescriptorState,
    guard: Option<DescriptorGuard>,
}

impl FileDescriptor {
    pub(crate) fn new(
        file: Arc<File>,
        flags: OpenFlags,
        editor: ContentEditor,
        guard: DescriptorGuard,
    ) -> Self {
        Self {
            file,
            flags,
            editor,
            state: DescriptorState::Created,
            guard: Some(guard),
        }
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub fn is_closed(&self) -> bool {
        self.state == DescriptorState::Closed
    }

    fn check_open(&self) -> Result<(), FsError> {
        if self.state == DescriptorState::Closed {
            return Err(FsError::Closed);
        }
        Ok(())
    }

    fn check_readable(&self) -> Result<(), FsError> {
        self.check_open()?;
        if !self.flags.read {
            return Err(FsError::NotPermitted("read on a write-only descriptor"));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<(), FsError> {
        self.check_open()?;
        if !self.flags.write {
            return Err(FsError::NotPermitted("write on a read-only descriptor"));
        }
        Ok(())
    }

    pub fn size(&self) -> Result<u64, FsError> {
        self.check_open()?;
        Ok(self.editor.size())
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        self.check_readable()?;
        Ok(self.editor.read(buf)?)
    }

    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, FsError> {
        self.check_readable()?;
        Ok(self.editor.read_at(buf, offset)?)
    }

    /// Read from the cursor to the end of the content
    pub fn read_to_end(&mut self) -> Result<Vec<u8>, FsError> {
        self.check_readable()?;
        let remaining = self.editor.size().saturating_sub(self.editor.position());
        let mut buf = vec![0u8; remaining as usize];
        let n = self.editor.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        self.check_writable()?;
        let n = self.editor.write(data)?;
        self.state = DescriptorState::Dirty;
        Ok(n)
    }

    pub fn write_at(&mut self, data: &[u8], offset: u64) -> Result<usize, FsError> {
        self.check_writable()?;
        let n = self.editor.write_at(data, offset)?;
        self.state = DescriptorState::Dirty;
        Ok(n)
    }

    pub fn truncate(&mut self, size: u64) -> Result<(), FsError> {
        self.check_writable()?;
        self.editor.truncate(size)?;
        self.state = DescriptorState::Dirty;
        Ok(())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError> {
        self.check_open()?;
        Ok(self.editor.seek(pos)?)
    }

    /// Commit pending writes and report them to the parent directory
    pub fn flush(&mut self) -> Result<(), FsError> {
        self.check_open()?;
        self.flush_up(self.flags.sync)
    }

    /// Flush, then release the descriptor lock.
    ///
    /// The lock is released even when the flush fails.
    pub fn close(&mut self) -> Result<(), FsError> {
        self.check_open()?;
        let result = self.flush_up(self.flags.sync);
        self.state = DescriptorState::Closed;
        self.guard = None;
        result
    }

    fn flush_up(&mut self, full_sync: bool) -> Result<(), FsError> {
        let node = match self.state {
            DescriptorState::Dirty => {
                let node = self.editor.commit()?;
                self.file.inode.store.put(&node)?;
                self.file.set_node(node.clone());
                node
            }
            DescriptorState::Created | DescriptorState::Flushed => {
                if !full_sync {
                    return Ok(());
                }
                self.file.get_node()
            }
            DescriptorState::Closed => return Err(FsError::Closed),
        };

        let parent = self.file.inode.parent()?;
        parent.update_child_entry(ChildEntry {
            name: self.file.inode.name.clone(),
            node,
        })?;
        self.state = DescriptorState::Flushed;
        debug!(file = %self.file.inode.name, size = self.editor.size(), "Flushed file");
        Ok(())
    }
}

impl Drop for FileDescriptor {
    fn drop(&mut self) {
        if self.state == DescriptorState::Closed {
            return;
        }
        if let Err(e) = self.close() {
            warn!(file = %self.file.inode.name, error = %e, "Close on drop failed");
        }
    }
}
