//! Chunked store I/O
//!
//! The name collection lives in shard files enumerated by `names-index.json`.
//! Shards are read one at a time, mutated in memory, and written back whole;
//! every destructive rewrite is preceded by exactly one timestamped backup
//! copy. A referenced shard missing from disk is skipped with a warning, not
//! a fatal error — a missing or unparseable index ends the run.

use crate::normalize::{self, DecodedShard};
use chrono::Utc;
use namebase_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use crate::normalize::ShardShape;

/// Index file name within the data directory
pub const INDEX_FILE: &str = "names-index.json";

/// `names-index.json` contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamesIndex {
    pub total_names: u64,
    /// Shard entries; processed in key order
    pub chunks: BTreeMap<String, ChunkEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One shard entry in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEntry {
    /// Shard filename, relative to the data directory
    pub file: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A loaded shard: decoded records plus everything needed to write it back
/// in place, shape preserved.
#[derive(Debug, Clone)]
pub struct Shard {
    pub key: String,
    pub path: PathBuf,
    pub decoded: DecodedShard,
}

impl Shard {
    pub fn shape(&self) -> ShardShape {
        self.decoded.shape
    }

    pub fn records(&self) -> &[crate::models::NameRecord] {
        &self.decoded.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<crate::models::NameRecord> {
        &mut self.decoded.records
    }
}

/// Handle to the sharded store rooted at a data directory
pub struct ChunkStore {
    data_dir: PathBuf,
    index: NamesIndex,
}

impl ChunkStore {
    /// Open the store by reading its index file.
    ///
    /// A missing or unparseable index is fatal — without it there is no
    /// authoritative shard list.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let index_path = data_dir.join(INDEX_FILE);
        if !index_path.exists() {
            return Err(Error::NotFound(format!(
                "index file {}",
                index_path.display()
            )));
        }
        let content = std::fs::read_to_string(&index_path)?;
        let index: NamesIndex = serde_json::from_str(&content)?;

        tracing::info!(
            total_names = index.total_names,
            chunks = index.chunks.len(),
            data_dir = %data_dir.display(),
            "Opened name store"
        );

        Ok(Self { data_dir, index })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn index(&self) -> &NamesIndex {
        &self.index
    }

    /// Shard keys in processing order (index key order)
    pub fn shard_keys(&self) -> Vec<String> {
        self.index.chunks.keys().cloned().collect()
    }

    /// Absolute path of a shard file
    pub fn shard_path(&self, key: &str) -> Result<PathBuf> {
        let entry = self
            .index
            .chunks
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("chunk {} in index", key)))?;
        Ok(self.data_dir.join(&entry.file))
    }

    /// Load one shard.
    ///
    /// Returns `Ok(None)` with a warning when the referenced file is absent
    /// from disk; malformed content is an error for this shard.
    pub fn load_shard(&self, key: &str) -> Result<Option<Shard>> {
        let path = self.shard_path(key)?;
        if !path.exists() {
            tracing::warn!(chunk = key, file = %path.display(), "Skipping missing shard");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&content)?;
        let decoded = normalize::decode_shard(value)?;

        tracing::debug!(chunk = key, records = decoded.records.len(), "Loaded shard");

        Ok(Some(Shard {
            key: key.to_string(),
            path,
            decoded,
        }))
    }

    /// Load every shard the index references, in order, skipping missing files.
    pub fn load_all_shards(&self) -> Result<Vec<Shard>> {
        let mut shards = Vec::new();
        for key in self.shard_keys() {
            if let Some(shard) = self.load_shard(&key)? {
                shards.push(shard);
            }
        }
        Ok(shards)
    }

    /// Write a shard back to its file, shape preserved.
    ///
    /// When the file already exists a single backup copy is made first,
    /// named `<stem>_backup_<contextTag>_<epochMillis>.json`. Returns the
    /// backup path if one was created.
    pub fn save_shard(&self, shard: &Shard, context_tag: &str) -> Result<Option<PathBuf>> {
        let backup = if shard.path.exists() {
            let backup_path = backup_path(&shard.path, context_tag, Utc::now().timestamp_millis());
            std::fs::copy(&shard.path, &backup_path)?;
            tracing::info!(chunk = %shard.key, backup = %backup_path.display(), "Backup created");
            Some(backup_path)
        } else {
            None
        };

        let value = normalize::encode_shard(&shard.decoded)?;
        let rendered = serde_json::to_string_pretty(&value)?;
        std::fs::write(&shard.path, rendered)?;

        tracing::info!(
            chunk = %shard.key,
            records = shard.decoded.records.len(),
            "Saved shard"
        );

        Ok(backup)
    }

    /// Overwrite a shard in place without taking a new backup.
    ///
    /// For repeated persists within one run after `save_shard` has already
    /// backed the file up — the later writes are continuations of the same
    /// rewrite, not new destructive operations.
    pub fn overwrite_shard(&self, shard: &Shard) -> Result<()> {
        let value = normalize::encode_shard(&shard.decoded)?;
        let rendered = serde_json::to_string_pretty(&value)?;
        std::fs::write(&shard.path, rendered)?;

        tracing::debug!(
            chunk = %shard.key,
            records = shard.decoded.records.len(),
            "Rewrote shard (continuation)"
        );
        Ok(())
    }
}

/// Backup file name: original with `_backup_<tag>_<millis>` inserted
/// before the `.json` extension.
fn backup_path(path: &Path, context_tag: &str, epoch_millis: i64) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("shard");
    path.with_file_name(format!("{}_backup_{}_{}.json", stem, context_tag, epoch_millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_name_inserted_before_extension() {
        let p = backup_path(Path::new("/data/names-chunk1.json"), "biblical_split", 1730000000000);
        assert_eq!(
            p,
            PathBuf::from("/data/names-chunk1_backup_biblical_split_1730000000000.json")
        );
    }

    #[test]
    fn index_parses_with_extra_fields() {
        let raw = r#"{
            "totalNames": 103422,
            "version": 3,
            "chunks": {
                "chunk1": {"file": "names-chunk1.json", "count": 26000},
                "chunk2": {"file": "names-chunk2.json"}
            }
        }"#;
        let index: NamesIndex = serde_json::from_str(raw).unwrap();
        assert_eq!(index.total_names, 103422);
        assert_eq!(index.chunks.len(), 2);
        assert_eq!(index.chunks["chunk1"].file, "names-chunk1.json");
        assert_eq!(index.extra.get("version"), Some(&Value::from(3)));
    }

    #[test]
    fn shard_keys_are_ordered() {
        let raw = r#"{
            "totalNames": 10,
            "chunks": {
                "chunk2": {"file": "b.json"},
                "chunk1": {"file": "a.json"},
                "chunk3": {"file": "c.json"}
            }
        }"#;
        let index: NamesIndex = serde_json::from_str(raw).unwrap();
        let store = ChunkStore {
            data_dir: PathBuf::from("/tmp"),
            index,
        };
        assert_eq!(store.shard_keys(), vec!["chunk1", "chunk2", "chunk3"]);
    }
}
