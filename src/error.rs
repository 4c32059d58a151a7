use std::io;

use thiserror::Error;

/// Errors produced by filesystem operations.
///
/// Every fatal condition aborts the current operation only; nothing here
/// terminates the process. Operations check for exhaustion and capacity
/// violations before committing anything to the container.
#[derive(Debug, Error)]
pub enum FsError {
    /// The container could not be opened, read, or written.
    #[error("container i/o failed: {0}")]
    Io(#[from] io::Error),

    /// The container's contents violate the on-disk layout.
    #[error("container is corrupt: {0}")]
    Corrupt(String),

    /// A path component or target does not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// A non-final path component resolved to a regular file.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The path itself is unusable for the requested operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No free inode or block remains, or a directory's entry list is full.
    #[error("no free {0}")]
    ResourceExhausted(&'static str),

    /// Content needs more blocks than an inode can address.
    #[error("file too large: needs {needed} blocks, limit is {limit}")]
    CapacityExceeded { needed: usize, limit: usize },
}

impl From<bincode::Error> for FsError {
    fn from(err: bincode::Error) -> Self {
        FsError::Corrupt(format!("record codec failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
