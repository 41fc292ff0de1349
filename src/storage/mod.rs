//! Filesystem-backed object storage

mod filesystem;

pub use filesystem::{FsBucket, ObjectEntry};

/// Storage backend errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Not a regular file: {0}")]
    NotAFile(String),

    #[error("Key resolves outside the bucket root: {0}")]
    OutsideRoot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Other(String),
}
