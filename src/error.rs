//! Error types for the dagfs mutable filesystem layer.

use crate::types::Hash;
use thiserror::Error;

/// Backing store and codec errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Node not found: {}", hex::encode(.0))]
    NodeNotFound(Hash),

    #[error("Corrupt node data: {0}")]
    Corrupt(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Moves rejected by path operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalMove {
    #[error("cannot move a directory into itself or one of its descendants")]
    ParentIntoChild,

    #[error("cannot overwrite a file with a directory")]
    DirOntoFile,
}

/// Outcome of waiting on the republisher other than success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RepublishError {
    #[error("publish wait cancelled by shutdown")]
    Cancelled,

    #[error("deadline exceeded waiting for publish")]
    DeadlineExceeded,

    #[error("republisher is closed")]
    Closed,
}

/// Error returned by a publish callback. Never surfaced to mutators; the
/// republisher logs it and retries.
#[derive(Debug, Clone, Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Filesystem tree errors
#[derive(Debug, Error)]
pub enum FsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),

    #[error("File opened for neither reading nor writing")]
    Mode,

    #[error("Operation not permitted by descriptor mode: {0}")]
    NotPermitted(&'static str),

    #[error("Descriptor already closed")]
    Closed,

    #[error("Node {0} is detached from its parent")]
    Detached(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Republish error: {0}")]
    Republish(#[from] RepublishError),
}

impl FsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

/// Logging setup errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid logging configuration: {0}")]
    Config(String),

    #[error("Failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Errors surfaced by the command-line front end
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration:\n{0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Filesystem not initialized; run `dagfs init` first")]
    NotInitialized,
}
