//! Record entries.
//!
//! An entry is one record: a payload plus optional metadata. On disk the
//! two live as sibling files sharing the decimal record index as their
//! basename; the payload carries the format's extension, the metadata is
//! always JSON under the `metadata` extension. Entries are immutable once
//! written, nothing ever rewrites them in place.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TreeError};
use crate::format::{self, FileFormat};
use crate::value::{Map, Payload};

/// Extension of the metadata side-file.
pub const METADATA_EXTENSION: &str = "metadata";

/// One record: a payload and optional metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeEntry {
    payload: Payload,
    metadata: Option<Map>,
}

impl TreeEntry {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            metadata: None,
        }
    }

    pub fn with_metadata(payload: Payload, metadata: Map) -> Self {
        Self {
            payload,
            metadata: Some(metadata),
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn metadata(&self) -> Option<&Map> {
        self.metadata.as_ref()
    }

    pub fn into_parts(self) -> (Payload, Option<Map>) {
        (self.payload, self.metadata)
    }

    /// Write the payload under `path`, swapping in the format's extension,
    /// and the metadata next to it when the store keeps metadata.
    ///
    /// An entry carrying metadata written into a store that does not keep
    /// metadata loses it with a log line rather than an error, so one
    /// entry value can be inserted into differently-configured stores.
    pub fn write(
        &self,
        path: &Path,
        metadata_path: Option<&Path>,
        file_format: FileFormat,
    ) -> Result<()> {
        let bytes = format::encode_payload(file_format, &self.payload)?;
        fs::write(data_path(path, file_format), bytes)?;
        match metadata_path {
            Some(metadata_path) => {
                let raw = serde_json::to_vec(&self.metadata)
                    .map_err(|e| TreeError::Serialization(e.to_string()))?;
                fs::write(metadata_path, raw)?;
            }
            None => {
                if self.metadata.is_some() {
                    debug!(path = %path.display(), "store keeps no metadata, dropping the entry's");
                }
            }
        }
        Ok(())
    }

    /// Load an entry back from its payload file, inferring the format
    /// from the extension.
    pub fn read(path: &Path, metadata_path: Option<&Path>) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file_format = FileFormat::from_extension(extension).ok_or_else(|| {
            TreeError::Serialization(format!(
                "no format matches data file extension {extension:?} ({})",
                path.display()
            ))
        })?;
        let bytes = fs::read(path)?;
        let payload = format::decode_payload(file_format, &bytes)?;
        let metadata = match metadata_path {
            Some(metadata_path) => serde_json::from_slice::<Option<Map>>(&fs::read(metadata_path)?)
                .map_err(|e| TreeError::Serialization(e.to_string()))?,
            None => None,
        };
        Ok(Self { payload, metadata })
    }
}

/// Replace whatever extension `path` carries with the format's own.
pub(crate) fn data_path(path: &Path, file_format: FileFormat) -> PathBuf {
    path.with_extension(file_format.extension())
}

/// Metadata sibling of a payload path.
pub(crate) fn metadata_path(path: &Path) -> PathBuf {
    path.with_extension(METADATA_EXTENSION)
}

// ---- tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Cell, Table};

    fn entry_with_metadata() -> TreeEntry {
        let table = Table::new(
            vec!["k".into()],
            vec![vec![Cell::Int(9)], vec![Cell::Text("x".into())]],
        )
        .unwrap();
        let mut metadata = Map::new();
        metadata.insert("origin".into(), serde_json::json!("unit-test"));
        TreeEntry::with_metadata(Payload::Table(table), metadata)
    }

    #[test]
    fn writes_payload_and_metadata_side_by_side() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("4");
        let entry = entry_with_metadata();
        entry
            .write(&base, Some(&metadata_path(&base)), FileFormat::Csv)
            .unwrap();

        assert!(dir.path().join("4.csv").is_file());
        assert!(dir.path().join("4.metadata").is_file());

        let back = TreeEntry::read(
            &dir.path().join("4.csv"),
            Some(&dir.path().join("4.metadata")),
        )
        .unwrap();
        assert_eq!(back, entry);

        let (payload, metadata) = back.into_parts();
        assert_eq!(&payload, entry.payload());
        assert_eq!(metadata.as_ref(), entry.metadata());
    }

    #[test]
    fn metadata_file_holds_null_when_entry_has_none() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("0");
        let entry = TreeEntry::new(Payload::Bytes(vec![1, 2, 3]));
        entry
            .write(&base, Some(&metadata_path(&base)), FileFormat::Bincode)
            .unwrap();

        let raw = fs::read_to_string(dir.path().join("0.metadata")).unwrap();
        assert_eq!(raw, "null");

        let back = TreeEntry::read(
            &dir.path().join("0.bincode"),
            Some(&dir.path().join("0.metadata")),
        )
        .unwrap();
        assert_eq!(back.metadata(), None);
    }

    #[test]
    fn metadata_is_dropped_when_store_keeps_none() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("2");
        entry_with_metadata()
            .write(&base, None, FileFormat::Rows)
            .unwrap();

        assert!(dir.path().join("2.rows").is_file());
        assert!(!dir.path().join("2.metadata").exists());

        let back = TreeEntry::read(&dir.path().join("2.rows"), None).unwrap();
        assert_eq!(back.metadata(), None);
    }

    #[test]
    fn read_rejects_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("3.parquet");
        fs::write(&path, b"whatever").unwrap();
        assert!(matches!(
            TreeEntry::read(&path, None),
            Err(TreeError::Serialization(_))
        ));
    }

    #[test]
    fn extension_is_replaced_not_stacked() {
        assert_eq!(
            data_path(Path::new("/t/data/0/7.old"), FileFormat::Json),
            Path::new("/t/data/0/7.json")
        );
        assert_eq!(
            data_path(Path::new("/t/data/0/7"), FileFormat::Json),
            Path::new("/t/data/0/7.json")
        );
        assert_eq!(
            metadata_path(Path::new("/t/data/0/7.json")),
            Path::new("/t/data/0/7.metadata")
        );
    }
}
