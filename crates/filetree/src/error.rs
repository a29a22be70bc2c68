use std::path::PathBuf;

use crate::format::FileFormat;

/// Errors from file tree operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The root path cannot host a store: not a directory, populated
    /// without a config file, or absent in read-only mode.
    #[error("invalid root directory {}: {reason}", .path.display())]
    InvalidRootDir { path: PathBuf, reason: String },

    /// The operation is forbidden in the tree's current mode.
    #[error("tree operation denied: {0}")]
    OperationDenied(String),

    /// A record index resolved outside the stored range.
    #[error("index {index} out of range for {len} record(s)")]
    IndexOutOfRange { index: i64, len: u64 },

    /// Tabular data with inconsistent row widths, or slice parameters
    /// that cannot describe a range.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The store's format cannot represent this payload kind.
    #[error("{format} format cannot hold a {payload} payload")]
    UnsupportedPayload {
        format: FileFormat,
        payload: &'static str,
    },

    /// The persisted config file is malformed or self-contradictory.
    #[error("invalid tree config: {0}")]
    InvalidConfig(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
