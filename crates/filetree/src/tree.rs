//! Store facade.
//!
//! A [`FileTree`] is a sequence-like handle over one store root:
//!
//! ```text
//! <root>/
//!   .filetree.json    persisted TreeConfig
//!   .LOCK             advisory lock token, content unused
//!   data/             record files under tree_depth directory levels
//! ```
//!
//! Any number of handles, in any number of processes, may point at the
//! same root. Reads take the shared lock, inserts the exclusive one, and
//! each operation re-checks the persisted config (by file modification
//! time) once the lock is held, so a handle can never act on another
//! writer's stale shape.
//!
//! Growth renames the whole `data/` directory through a `.GROWING.data`
//! staging name and threads it back in as the all-zero subtree of the
//! deeper layout. Record files themselves never move relative to their
//! leaf, whatever the store size.

use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use tracing::{debug, info};

use crate::config::TreeConfig;
use crate::entry::{self, TreeEntry};
use crate::error::{Result, TreeError};
use crate::format::FileFormat;
use crate::layout;
use crate::lock::LockFile;
use crate::slice::{SliceIter, TreeSlice};

/// Name of the persisted config file inside the root.
pub const CONFIG_FILE: &str = ".filetree.json";
/// Name of the advisory lock token inside the root.
pub const LOCK_FILE: &str = ".LOCK";
/// Name of the record directory inside the root.
pub const DATA_DIR: &str = "data";
/// Staging name the record directory takes while the tree gains depth.
const GROWING_DIR: &str = ".GROWING.data";

/// Creation-time options for [`FileTree::create`].
///
/// They only take effect when a brand-new store is initialized; opening
/// an existing root keeps its persisted config and ignores these.
#[derive(Clone, Debug)]
pub struct TreeOptions {
    /// Index bits per directory level; leaf capacity is `2^leaf_depth`.
    pub leaf_depth: u32,
    /// Initial directory levels above the leaves. Grows on demand.
    pub tree_depth: u32,
    /// Payload serialization format. Mandatory, there is no default.
    pub file_format: FileFormat,
    /// Whether records carry a metadata side-file.
    pub has_metadata: bool,
}

impl TreeOptions {
    /// Conventional defaults around a mandatory format: 128-record
    /// leaves, two directory levels, metadata kept.
    pub fn new(file_format: FileFormat) -> Self {
        Self {
            leaf_depth: 7,
            tree_depth: 2,
            file_format,
            has_metadata: true,
        }
    }
}

#[derive(Debug)]
struct ConfigCache {
    config: TreeConfig,
    /// Modification time of the config file when it was last parsed or
    /// written through this handle.
    last_read: SystemTime,
}

/// Handle on a store root. See the module docs for the on-disk shape.
pub struct FileTree {
    root: PathBuf,
    readonly: bool,
    lock: LockFile,
    cache: RwLock<ConfigCache>,
}

impl FileTree {
    /// Create a store at `root`, or open the one already there.
    ///
    /// `root` may be missing, an empty directory, or an existing store.
    /// When a store already lives there its persisted config wins and
    /// `options` is ignored.
    pub fn create(root: impl AsRef<Path>, options: TreeOptions) -> Result<Self> {
        Self::open_inner(root.as_ref().to_path_buf(), false, Some(options))
    }

    /// Open an existing store read-write.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_inner(root.as_ref().to_path_buf(), false, None)
    }

    /// Open an existing store read-only.
    ///
    /// Never alters store contents; the only file a reader may create is
    /// the lock token itself.
    pub fn open_readonly(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_inner(root.as_ref().to_path_buf(), true, None)
    }

    fn open_inner(root: PathBuf, readonly: bool, options: Option<TreeOptions>) -> Result<Self> {
        validate_root(&root, readonly)?;
        let config_path = root.join(CONFIG_FILE);
        if readonly && !config_path.is_file() {
            return Err(TreeError::OperationDenied(
                "cannot initialize a store in read-only mode".into(),
            ));
        }
        if !readonly {
            if options.is_none() && !config_path.is_file() {
                return Err(TreeError::InvalidRootDir {
                    path: root,
                    reason: "no config file; the store was never created".into(),
                });
            }
            fs::create_dir_all(root.join(DATA_DIR))?;
        }
        let lock = LockFile::new(root.join(LOCK_FILE));
        let guard = if readonly {
            lock.shared()?
        } else {
            lock.exclusive()?
        };
        let cache = initial_cache(&root, options)?;
        drop(guard);
        Ok(Self {
            root,
            readonly,
            lock,
            cache: RwLock::new(cache),
        })
    }

    /// Fetch one record. Negative indices count from the end.
    pub fn get(&self, index: i64) -> Result<TreeEntry> {
        let _guard = self.lock.shared()?;
        let config = self.reload_config()?;
        let resolved = normalize_index(index, config.file_count)?;
        let (data, metadata) = self.record_paths(resolved, &config);
        TreeEntry::read(&data, metadata.as_deref())
    }

    /// Append a batch of records, returning the index range they took.
    ///
    /// The batch is written under one exclusive lock: records land at
    /// consecutive indices with no foreign writes interleaved. An empty
    /// batch returns an empty range at the current count and touches
    /// nothing.
    pub fn insert(&self, entries: &[TreeEntry]) -> Result<Range<u64>> {
        if self.readonly {
            return Err(TreeError::OperationDenied(
                "insert failed: tree opened in read-only mode".into(),
            ));
        }
        let _guard = self.lock.exclusive()?;
        let mut config = self.reload_config()?;
        let first = config.file_count;
        if entries.is_empty() {
            return Ok(first..first);
        }
        let new_count = first + entries.len() as u64;
        config = self.grow(config, new_count)?;
        let leaf_capacity = config.leaf_capacity();
        for (offset, record) in entries.iter().enumerate() {
            let index = first + offset as u64;
            let (data, metadata) = self.record_paths(index, &config);
            if index % leaf_capacity == 0 {
                if let Some(leaf_dir) = data.parent() {
                    debug!(path = %leaf_dir.display(), "creating leaf directory");
                    fs::create_dir_all(leaf_dir)?;
                }
            }
            record.write(&data, metadata.as_deref(), config.file_format)?;
        }
        self.write_config(config.with_file_count(new_count)?)?;
        debug!(first, count = entries.len(), "records inserted");
        Ok(first..new_count)
    }

    /// Append a single record, returning its index.
    pub fn insert_one(&self, record: &TreeEntry) -> Result<u64> {
        let range = self.insert(std::slice::from_ref(record))?;
        Ok(range.start)
    }

    /// Locked lookup of the files backing one record, without reading
    /// them. The metadata path is `None` for stores that keep none.
    pub fn paths(&self, index: i64) -> Result<(PathBuf, Option<PathBuf>)> {
        let _guard = self.lock.shared()?;
        let config = self.reload_config()?;
        let resolved = normalize_index(index, config.file_count)?;
        Ok(self.record_paths(resolved, &config))
    }

    /// Lazy view over a range of records; sequence slicing semantics.
    pub fn slice(&self, start: Option<i64>, stop: Option<i64>, step: i64) -> Result<TreeSlice<'_>> {
        if step == 0 {
            return Err(TreeError::ShapeMismatch("slice step cannot be zero".into()));
        }
        Ok(TreeSlice::new(self, start, stop, step))
    }

    /// Iterate every record from the first to the last.
    pub fn entries(&self) -> SliceIter<'_> {
        TreeSlice::new(self, None, None, 1).iter()
    }

    /// Number of records, per this handle's cached config.
    ///
    /// Lock-free and possibly stale; any locked operation refreshes it.
    pub fn len(&self) -> u64 {
        self.cache
            .read()
            .expect("config cache poisoned")
            .config
            .file_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of this handle's cached config.
    pub fn config(&self) -> TreeConfig {
        self.cache
            .read()
            .expect("config cache poisoned")
            .config
            .clone()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Re-parse the persisted config if someone modified it since this
    /// handle last read or wrote it. Call with the file lock held.
    fn reload_config(&self) -> Result<TreeConfig> {
        let config_path = self.config_path();
        let modified = fs::metadata(&config_path)?.modified()?;
        {
            let cache = self.cache.read().expect("config cache poisoned");
            if modified <= cache.last_read {
                return Ok(cache.config.clone());
            }
        }
        debug!(path = %config_path.display(), "config changed on disk, reloading");
        let config = TreeConfig::load(&config_path)?;
        let mut cache = self.cache.write().expect("config cache poisoned");
        cache.config = config.clone();
        cache.last_read = modified;
        Ok(config)
    }

    /// Persist `config` and make it this handle's cached view. Call with
    /// the exclusive lock held.
    fn write_config(&self, config: TreeConfig) -> Result<()> {
        if self.readonly {
            return Err(TreeError::OperationDenied(
                "cannot rewrite the config of a read-only store".into(),
            ));
        }
        let config_path = self.config_path();
        debug!(
            path = %config_path.display(),
            file_count = config.file_count,
            tree_depth = config.tree_depth,
            "writing config"
        );
        config.store(&config_path)?;
        let modified = fs::metadata(&config_path)?.modified()?;
        let mut cache = self.cache.write().expect("config cache poisoned");
        cache.config = config;
        cache.last_read = modified;
        Ok(())
    }

    /// Deepen the tree until `new_count` records are addressable.
    ///
    /// The existing `data/` directory moves aside under a staging name,
    /// a chain of zero-named directories replaces it, and the staged
    /// tree is renamed back in as the innermost zero child. The cost is
    /// two renames and one mkdir chain regardless of store size.
    fn grow(&self, config: TreeConfig, new_count: u64) -> Result<TreeConfig> {
        let required = layout::required_depth(new_count, config.leaf_depth);
        if required <= config.tree_depth {
            return Ok(config);
        }
        let extra = required - config.tree_depth;
        info!(
            from = config.tree_depth,
            to = required,
            new_count,
            "growing the directory tree"
        );
        if config.file_count > 0 {
            let data_dir = self.data_dir();
            let staging = self.root.join(GROWING_DIR);
            fs::rename(&data_dir, &staging)?;
            let mut parent = data_dir;
            for _ in 1..extra {
                parent.push("0");
            }
            fs::create_dir_all(&parent)?;
            fs::rename(&staging, parent.join("0"))?;
        }
        let config = config.with_tree_depth(required)?;
        self.write_config(config.clone())?;
        Ok(config)
    }

    /// Data file and metadata file locations for a resolved index.
    fn record_paths(&self, index: u64, config: &TreeConfig) -> (PathBuf, Option<PathBuf>) {
        let mut dir = self.data_dir();
        for segment in layout::decompose(index, config.leaf_depth, config.tree_depth) {
            dir.push(segment.to_string());
        }
        let data = dir.join(format!("{index}.{}", config.file_format.extension()));
        let metadata = config.has_metadata.then(|| entry::metadata_path(&data));
        (data, metadata)
    }

    fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }
}

impl fmt::Debug for FileTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTree")
            .field("root", &self.root)
            .field("readonly", &self.readonly)
            .field("len", &self.len())
            .finish()
    }
}

/// Resolve a possibly-negative index against `file_count`, rejecting
/// anything outside the stored range on either side.
fn normalize_index(index: i64, file_count: u64) -> Result<u64> {
    let resolved = if index < 0 {
        index + file_count as i64
    } else {
        index
    };
    if resolved < 0 || resolved as u64 >= file_count {
        return Err(TreeError::IndexOutOfRange {
            index,
            len: file_count,
        });
    }
    Ok(resolved as u64)
}

fn validate_root(root: &Path, readonly: bool) -> Result<()> {
    if !root.exists() {
        if readonly {
            return Err(TreeError::InvalidRootDir {
                path: root.to_path_buf(),
                reason: "directory does not exist and read-only mode cannot create it".into(),
            });
        }
        return Ok(());
    }
    if !root.is_dir() {
        return Err(TreeError::InvalidRootDir {
            path: root.to_path_buf(),
            reason: "path exists but is not a directory".into(),
        });
    }
    if root.join(CONFIG_FILE).is_file() {
        return Ok(());
    }
    if fs::read_dir(root)?.next().is_some() {
        return Err(TreeError::InvalidRootDir {
            path: root.to_path_buf(),
            reason: "directory is not empty but has no config file".into(),
        });
    }
    Ok(())
}

/// First config read, under the open lock. Initializes a new config from
/// `options` when none is persisted yet.
fn initial_cache(root: &Path, options: Option<TreeOptions>) -> Result<ConfigCache> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.is_file() {
        if options.is_some() {
            debug!("existing store found, creation options ignored");
        }
        let config = TreeConfig::load(&config_path)?;
        let last_read = fs::metadata(&config_path)?.modified()?;
        return Ok(ConfigCache { config, last_read });
    }
    let Some(options) = options else {
        return Err(TreeError::OperationDenied(
            "store config file missing and no creation options given".into(),
        ));
    };
    info!(path = %config_path.display(), "initializing new store config");
    let config = TreeConfig::new(
        options.tree_depth,
        options.leaf_depth,
        options.file_format,
        options.has_metadata,
    )?;
    config.store(&config_path)?;
    let last_read = fs::metadata(&config_path)?.modified()?;
    Ok(ConfigCache { config, last_read })
}

// ---- tests ----
