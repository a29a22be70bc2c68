//! Append-mostly, index-addressed record store on a local filesystem.
//!
//! This crate maps a dense, monotonically growing record index to a pair
//! of files (payload plus optional metadata) inside a directory tree with
//! bounded fan-out. One writer and any number of readers can share a
//! store root across processes; an advisory file lock serializes them.
//!
//! # Pieces
//!
//! - [`FileTree`] -- the store handle: create/open, `get`, `insert`, `slice`
//! - [`TreeEntry`] -- one record: a [`Payload`] plus optional metadata
//! - [`FileFormat`] -- per-store payload serialization, fixed at creation
//! - [`TreeConfig`] -- the persisted shape, one JSON file at the root
//! - [`TreeSlice`] -- lazy, restartable views over index ranges
//!
//! # On-disk shape
//!
//! ```text
//! <root>/
//!   .filetree.json                          persisted TreeConfig
//!   .LOCK                                   advisory lock token
//!   data/<seg>/../<seg>/<index>.<ext>       record payload
//!   data/<seg>/../<seg>/<index>.metadata    optional metadata, JSON
//! ```
//!
//! # Design Rules
//!
//! 1. Records are immutable once written; the store only appends.
//! 2. `file_count` in the config is the sole source of truth for
//!    membership; stray files beyond it do not exist.
//! 3. Reads hold the shared lock and inserts the exclusive lock for the
//!    whole operation, config check included.
//! 4. The tree deepens with a constant number of directory renames, and
//!    growth never rewrites a record file.
//! 5. All I/O errors are propagated, never silently ignored.
//!
//! # Example
//!
//! ```no_run
//! use filetree::{FileFormat, FileTree, Map, Payload, TreeEntry, TreeOptions};
//!
//! let tree = FileTree::create("./corpus", TreeOptions::new(FileFormat::Json))?;
//! let mut map = Map::new();
//! map.insert("lang".into(), serde_json::json!("am"));
//! let range = tree.insert(&[TreeEntry::new(Payload::Map(map))])?;
//! let back = tree.get(range.start as i64)?;
//! assert_eq!(back.metadata(), None);
//! # Ok::<(), filetree::TreeError>(())
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod format;
pub mod layout;
mod lock;
pub mod slice;
pub mod tree;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use config::TreeConfig;
pub use entry::TreeEntry;
pub use error::{Result, TreeError};
pub use format::{decode_payload, encode_payload, FileFormat};
pub use slice::{IndexIter, SliceIter, TreeSlice};
pub use tree::{FileTree, TreeOptions, CONFIG_FILE, DATA_DIR, LOCK_FILE};
pub use value::{Cell, Map, Payload, Table};
