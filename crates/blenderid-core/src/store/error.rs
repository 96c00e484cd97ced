use std::path::PathBuf;

use thiserror::Error;

/// Hard failures of the profile store.
///
/// Malformed store contents are not an error; they are repaired in place.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create profile directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read profile store {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write profile store {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to replace profile store {}: {source}", .path.display())]
    Rename {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize profile store: {0}")]
    Serialize(#[from] serde_json::Error),
}
