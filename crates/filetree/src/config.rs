//! Persisted store configuration.
//!
//! One JSON document at the store root describes everything a process
//! needs to address records: the shape of the directory tree, the payload
//! format, and the record count. `file_count` is the single source of
//! truth for membership; stray files beyond it are invisible until the
//! count says otherwise.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};
use crate::format::FileFormat;
use crate::layout;

/// Shape and contents summary of a store, as persisted in its config file.
///
/// Only `file_count` and `tree_depth` ever change after initialization,
/// and "change" means building a validated replacement value with
/// [`TreeConfig::with_file_count`] or [`TreeConfig::with_tree_depth`];
/// the struct itself stays immutable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Number of records in the store.
    pub file_count: u64,
    /// Directory levels between the data root and the leaf files.
    pub tree_depth: u32,
    /// Index bits consumed per level; leaf capacity is `2^leaf_depth`.
    pub leaf_depth: u32,
    /// Payload serialization format, fixed at creation.
    pub file_format: FileFormat,
    /// Whether records carry a metadata side-file.
    pub has_metadata: bool,
}

impl TreeConfig {
    /// Build and validate a config for a brand-new, empty store.
    pub fn new(
        tree_depth: u32,
        leaf_depth: u32,
        file_format: FileFormat,
        has_metadata: bool,
    ) -> Result<Self> {
        let config = Self {
            file_count: 0,
            tree_depth,
            leaf_depth,
            file_format,
            has_metadata,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.leaf_depth < 1 || self.leaf_depth > layout::MAX_LEAF_DEPTH {
            return Err(TreeError::InvalidConfig(format!(
                "leaf_depth {} outside 1..={}",
                self.leaf_depth,
                layout::MAX_LEAF_DEPTH
            )));
        }
        if self.tree_depth < 1 {
            return Err(TreeError::InvalidConfig("tree_depth must be at least 1".into()));
        }
        // tree_depth directory chunks plus the leaf chunk.
        let address_bits = u64::from(self.leaf_depth) * (u64::from(self.tree_depth) + 1);
        if u64::from(layout::bits_for(self.file_count)) > address_bits {
            return Err(TreeError::InvalidConfig(format!(
                "tree of depth {} cannot address {} record(s)",
                self.tree_depth, self.file_count
            )));
        }
        Ok(())
    }

    /// Records a leaf directory can hold.
    pub fn leaf_capacity(&self) -> u64 {
        1u64 << self.leaf_depth
    }

    /// Copy with a new record count, revalidated.
    pub fn with_file_count(&self, file_count: u64) -> Result<Self> {
        let config = Self {
            file_count,
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// Copy with a new tree depth, revalidated.
    pub fn with_tree_depth(&self, tree_depth: u32) -> Result<Self> {
        let config = Self {
            tree_depth,
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| TreeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config file in place.
    pub fn store(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| TreeError::Serialization(e.to_string()))?;
        fs::write(path, raw)?;
        Ok(())
    }
}

// ---- tests ----
