//! On-disk layout of the cache directory.
//!
//! ```text
//! <cache_dir>/videos/video:<id>.json
//! <cache_dir>/playlists/playlist:<id>.json  + playlist:<id>.idx/
//! <cache_dir>/channels/channel:<id>.json    + channel:<id>.idx/
//! <cache_dir>/channels/alias:<alias>.json
//! ```
//!
//! `.idx` entries are index directories managed by the index library; they
//! live beside the scope's JSON snapshot in the same store directory.

use std::path::{Path, PathBuf};

use tubescan_core::{Result, ScopeKey, ScopeKind};

use crate::store::{JsonStore, safe_file_name};

pub const VIDEO_KEY_PREFIX: &str = "video:";
pub const ALIAS_KEY_PREFIX: &str = "alias:";
const INDEX_EXTENSION: &str = "idx";

#[derive(Debug, Clone)]
pub struct Storage {
  root: PathBuf,
  pub videos: JsonStore,
  pub playlists: JsonStore,
  pub channels: JsonStore,
}

impl Storage {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    Self {
      videos: JsonStore::new(root.join("videos")),
      playlists: JsonStore::new(root.join("playlists")),
      channels: JsonStore::new(root.join("channels")),
      root,
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// The JSON store a scope's snapshot lives in.
  pub fn store_for(&self, kind: ScopeKind) -> &JsonStore {
    match kind {
      ScopeKind::Video => &self.videos,
      ScopeKind::Playlist => &self.playlists,
      ScopeKind::Channel => &self.channels,
    }
  }

  pub fn video_key(id: &str) -> String {
    format!("{VIDEO_KEY_PREFIX}{id}")
  }

  pub fn alias_key(alias: &str) -> String {
    format!("{ALIAS_KEY_PREFIX}{alias}")
  }

  /// The index directory for a scope, beside its JSON snapshot.
  pub fn index_path(&self, key: &ScopeKey) -> PathBuf {
    let store = self.store_for(key.kind);
    store
      .dir()
      .join(format!("{}.{INDEX_EXTENSION}", safe_file_name(&key.to_string())))
  }

  pub async fn delete_index(&self, key: &ScopeKey) -> Result<bool> {
    let path = self.index_path(key);
    match tokio::fs::remove_dir_all(&path).await {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(e.into()),
    }
  }

  /// Clear JSON entries across all stores, and index directories whose scope
  /// snapshot was cleared.
  pub async fn clear(&self, prefix: Option<&str>, not_accessed_for_days: Option<u16>) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for store in [&self.videos, &self.playlists, &self.channels] {
      for key in store.clear(prefix, not_accessed_for_days).await? {
        if let Some(scope_key) = parse_scope_key(&key) {
          self.delete_index(&scope_key).await?;
        }
        removed.push(key);
      }
    }
    Ok(removed)
  }

  pub async fn list(&self, prefix: Option<&str>, not_accessed_for_days: Option<u16>) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    for store in [&self.videos, &self.playlists, &self.channels] {
      keys.extend(store.list(prefix, not_accessed_for_days).await?);
    }
    keys.sort();
    Ok(keys)
  }
}

fn parse_scope_key(key: &str) -> Option<ScopeKey> {
  let (prefix, id) = key.split_once(':')?;
  let kind = match prefix {
    "video" => ScopeKind::Video,
    "playlist" => ScopeKind::Playlist,
    "channel" => ScopeKind::Channel,
    _ => return None,
  };
  Some(ScopeKey {
    kind,
    id: id.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_layout_paths() {
    let storage = Storage::new("/tmp/tubescan-test");

    assert_eq!(
      storage.videos.path_for(&Storage::video_key("abc")),
      Path::new("/tmp/tubescan-test/videos/video:abc.json")
    );
    assert_eq!(
      storage.index_path(&ScopeKey::playlist("PL1")),
      Path::new("/tmp/tubescan-test/playlists/playlist:PL1.idx")
    );
    assert_eq!(
      storage.channels.path_for(&Storage::alias_key("handle")),
      Path::new("/tmp/tubescan-test/channels/alias:handle.json")
    );
  }

  #[tokio::test]
  async fn test_clear_removes_index_beside_snapshot() {
    let dir = TempDir::new().unwrap();
    let storage = Storage::new(dir.path());
    let key = ScopeKey::playlist("PL1");

    storage
      .playlists
      .set(&key.to_string(), &serde_json::json!({"loaded": "2024-01-01T00:00:00Z", "videos": []}))
      .await
      .unwrap();
    tokio::fs::create_dir_all(storage.index_path(&key)).await.unwrap();

    let removed = storage.clear(Some("playlist:"), None).await.unwrap();
    assert_eq!(removed, vec!["playlist:PL1"]);
    assert!(!storage.index_path(&key).exists());
  }

  #[tokio::test]
  async fn test_list_spans_stores() {
    let dir = TempDir::new().unwrap();
    let storage = Storage::new(dir.path());

    storage
      .videos
      .set(&Storage::video_key("a"), &serde_json::json!({}))
      .await
      .unwrap();
    storage
      .channels
      .set(&Storage::alias_key("h"), &serde_json::json!("UC1"))
      .await
      .unwrap();

    let keys = storage.list(None, None).await.unwrap();
    assert_eq!(keys, vec!["alias:h", "video:a"]);
  }
}
