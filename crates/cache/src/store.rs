//! JSON key/value store over one flat directory.
//!
//! Keys map to `<dir>/<key>.json`. Writes are atomic (temp file + rename);
//! a file that fails to parse is deleted and treated as absent so callers
//! fall through to a fresh fetch or rebuild.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use tubescan_core::Result;

const JSON_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct JsonStore {
  dir: PathBuf,
}

impl JsonStore {
  pub fn new(dir: PathBuf) -> Self {
    Self { dir }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.{JSON_EXTENSION}", safe_file_name(key)))
  }

  /// Read and deserialize the value under `key`. A corrupt file is deleted
  /// and reported as absent.
  pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    let path = self.path_for(key);
    let raw = match tokio::fs::read(&path).await {
      Ok(raw) => raw,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice(&raw) {
      Ok(value) => Ok(Some(value)),
      Err(e) => {
        warn!(key, error = %e, "corrupt cache file, deleting");
        let _ = tokio::fs::remove_file(&path).await;
        Ok(None)
      }
    }
  }

  /// Serialize and write the value under `key` atomically.
  pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
    tokio::fs::create_dir_all(&self.dir).await?;

    let path = self.path_for(key);
    let tmp = path.with_extension("json.tmp");
    let raw = serde_json::to_vec(value)?;

    tokio::fs::write(&tmp, &raw).await?;
    tokio::fs::rename(&tmp, &path).await?;
    debug!(key, bytes = raw.len(), "cache write");
    Ok(())
  }

  /// Remove the value under `key`. Returns whether it existed.
  pub async fn delete(&self, key: &str) -> Result<bool> {
    match tokio::fs::remove_file(self.path_for(key)).await {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(e.into()),
    }
  }

  pub async fn exists(&self, key: &str) -> bool {
    tokio::fs::try_exists(self.path_for(key)).await.unwrap_or(false)
  }

  /// Enumerate keys, optionally filtered by prefix and by the time since the
  /// file was last accessed.
  pub async fn list(&self, prefix: Option<&str>, not_accessed_for_days: Option<u16>) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut entries = match tokio::fs::read_dir(&self.dir).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
      Err(e) => return Err(e.into()),
    };

    let cutoff = not_accessed_for_days.map(|days| Duration::from_secs(u64::from(days) * 24 * 60 * 60));

    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some(JSON_EXTENSION) {
        continue;
      }
      let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
        continue;
      };
      if let Some(prefix) = prefix
        && !key.starts_with(prefix)
      {
        continue;
      }
      if let Some(cutoff) = cutoff
        && !older_than(&entry, cutoff).await
      {
        continue;
      }
      keys.push(key);
    }

    keys.sort();
    Ok(keys)
  }

  /// Delete everything matching the filters. Returns the deleted keys.
  pub async fn clear(&self, prefix: Option<&str>, not_accessed_for_days: Option<u16>) -> Result<Vec<String>> {
    let keys = self.list(prefix, not_accessed_for_days).await?;
    for key in &keys {
      self.delete(key).await?;
    }
    Ok(keys)
  }
}

async fn older_than(entry: &tokio::fs::DirEntry, cutoff: Duration) -> bool {
  let Ok(meta) = entry.metadata().await else {
    return false;
  };
  // Last access time where the filesystem records it, modification time
  // otherwise (noatime mounts).
  let stamp = meta.accessed().or_else(|_| meta.modified());
  match stamp {
    Ok(stamp) => SystemTime::now().duration_since(stamp).map(|age| age >= cutoff).unwrap_or(false),
    Err(_) => false,
  }
}

/// Keep cache keys usable as file names across platforms. The `:` separator
/// in scope keys is kept; path separators and wildcard characters are not.
pub fn safe_file_name(key: &str) -> String {
  key
    .chars()
    .map(|c| match c {
      '/' | '\\' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
      c => c,
    })
    .collect()
}
