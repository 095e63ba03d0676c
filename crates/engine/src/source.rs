//! The engine-side video source handed to index searches.

use std::sync::Arc;

use async_trait::async_trait;
use cache::Storage;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tubescan_core::{Error, PlaylistSnapshot, Result, ScopeKey};
use youtube::YouTubeClient;

use index::{SourcedVideo, VideoSource};

use crate::fetch::load_or_fetch;

/// Shared, persisted view of the scope's snapshot, updated as searches learn
/// upload dates.
pub struct SnapshotHandle {
  pub key: ScopeKey,
  pub snapshot: Mutex<PlaylistSnapshot>,
}

/// Materializes hit videos from the cache, falling back to the client; a
/// video whose blob had to be rebuilt is reported stale so the search's drift
/// recovery re-indexes it.
pub struct EngineVideoSource {
  storage: Arc<Storage>,
  client: Arc<dyn YouTubeClient>,
  cancel: CancellationToken,
  snapshot: Option<Arc<SnapshotHandle>>,
}

impl EngineVideoSource {
  pub fn new(storage: Arc<Storage>, client: Arc<dyn YouTubeClient>, cancel: CancellationToken) -> Self {
    Self {
      storage,
      client,
      cancel,
      snapshot: None,
    }
  }

  pub fn with_snapshot(mut self, handle: Arc<SnapshotHandle>) -> Self {
    self.snapshot = Some(handle);
    self
  }
}

#[async_trait]
impl VideoSource for EngineVideoSource {
  async fn video(&self, id: &str) -> Result<Option<SourcedVideo>> {
    match load_or_fetch(&self.storage, &*self.client, id, &self.cancel).await {
      Ok((video, false)) => Ok(Some(SourcedVideo::cached(video))),
      Ok((video, true)) => Ok(Some(SourcedVideo::rebuilt(video))),
      Err(Error::RemoteNotFound { .. }) => Ok(None),
      Err(e) => Err(e),
    }
  }

  async fn record_uploaded(&self, entries: &[(String, DateTime<Utc>)]) -> Result<()> {
    let Some(handle) = &self.snapshot else {
      return Ok(());
    };

    let mut snapshot = handle.snapshot.lock().await;
    let mut changed = false;
    for (id, uploaded) in entries {
      // Hydration only fills gaps; dates the snapshot already knows win.
      if snapshot.uploaded(id).is_none() {
        changed |= snapshot.set_uploaded(id, *uploaded);
      }
    }
    if changed {
      let store = self.storage.store_for(handle.key.kind);
      store.set(&handle.key.to_string(), &*snapshot).await?;
      debug!(scope = %handle.key, "snapshot upload dates hydrated");
    }
    Ok(())
  }
}
