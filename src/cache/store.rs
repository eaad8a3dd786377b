use std::{
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{
    cache::error::{CacheError, internal_error, io_error, serialization_error},
    config::CacheConfig,
};

/// One cached tool output. Immutable once written; a `put` under the same key
/// replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: String,
    pub created_at: String,
}

/// Builds the content-addressed key for a (source, consumer) pair. The same
/// inputs always resolve to the same key.
pub fn derive_key(source_identifier: &str, consumer_identifier: &str) -> String {
    let digest = Sha256::digest(source_identifier.as_bytes());
    format!("{:x}:{}", digest, consumer_identifier)
}

/// Partitioned persistent key/value store. Each partition is a single JSON
/// file; writers lock their target partition and replace the file atomically,
/// readers rely on rename visibility and take no lock.
pub struct CacheStore {
    dir: PathBuf,
    partition_count: u32,
    partition_locks: Vec<Mutex<()>>,
}

impl CacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        let partition_count = config.partition_count.max(1);
        let partition_locks = (0..partition_count).map(|_| Mutex::new(())).collect();
        Self {
            dir: config.dir.clone(),
            partition_count,
            partition_locks,
        }
    }

    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }

    pub fn partition_index(&self, key: &str) -> usize {
        let digest = Sha256::digest(key.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(prefix) % u64::from(self.partition_count)) as usize
    }

    fn partition_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("partition-{index}.json"))
    }

    /// Returns the entry for `key`, or `None` on partition miss, key miss, or
    /// a corrupted partition file. Corruption is never an error here, only a
    /// miss: the cache is a cost optimization, not a source of truth.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.partition_path(self.partition_index(key));
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(
                    target: "cache",
                    partition = %path.display(),
                    error = %err,
                    "cache_partition_unreadable"
                );
                return None;
            }
        };

        let entries: BTreeMap<String, CacheEntry> = match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(
                    target: "cache",
                    partition = %path.display(),
                    error = %err,
                    "cache_partition_corrupt"
                );
                return None;
            }
        };

        entries.get(key).cloned()
    }

    /// Writes `content` under `key`, overwriting any existing entry
    /// (last-write-wins). Safe under concurrent writers in the same
    /// partition: the mutation runs under the partition lock and lands via
    /// temp-file-then-rename.
    pub fn put(&self, key: &str, content: &str) -> Result<(), CacheError> {
        let index = self.partition_index(key);
        let _guard = self.partition_locks[index]
            .lock()
            .map_err(|_| internal_error("cache partition lock poisoned"))?;

        let path = self.partition_path(index);
        let mut entries = self.read_partition_for_update(&path);
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| internal_error(format!("failed to format timestamp: {err}")))?;
        entries.insert(
            key.to_string(),
            CacheEntry {
                content: content.to_string(),
                created_at,
            },
        );

        self.write_partition(&path, &entries)
    }

    fn read_partition_for_update(&self, path: &PathBuf) -> BTreeMap<String, CacheEntry> {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(
                        target: "cache",
                        partition = %path.display(),
                        error = %err,
                        "cache_partition_corrupt_rebuilding"
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        }
    }

    fn write_partition(
        &self,
        path: &PathBuf,
        entries: &BTreeMap<String, CacheEntry>,
    ) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            io_error(format!(
                "failed to create cache directory '{}': {err}",
                self.dir.display()
            ))
        })?;

        let tmp_path = path.with_extension("tmp");
        let file = fs::File::create(&tmp_path).map_err(|err| {
            io_error(format!(
                "failed to create cache temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;
        {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, entries).map_err(|err| {
                serialization_error(format!(
                    "failed to serialize cache partition '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.flush().map_err(|err| {
                io_error(format!(
                    "failed to flush cache partition '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        }

        let tmp_file = fs::OpenOptions::new()
            .read(true)
            .open(&tmp_path)
            .map_err(|err| {
                io_error(format!(
                    "failed to reopen cache temp file '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        tmp_file.sync_all().map_err(|err| {
            io_error(format!(
                "failed to sync cache temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;

        fs::rename(&tmp_path, path).map_err(|err| {
            io_error(format!(
                "failed to replace cache partition '{}' from '{}': {err}",
                path.display(),
                tmp_path.display()
            ))
        })?;

        Ok(())
    }
}
