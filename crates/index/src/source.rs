//! The callback seam search execution uses to materialize hit videos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tubescan_core::{Result, Video};

/// A video produced for result construction.
#[derive(Debug, Clone)]
pub struct SourcedVideo {
  pub video: Video,
  /// The video blob had to be rebuilt (cache miss, corruption) after the
  /// index row was written, so the indexed document may no longer match the
  /// blob. Stale videos are excluded from the current pass and re-indexed by
  /// the one-shot drift recovery.
  pub stale: bool,
}

impl SourcedVideo {
  pub fn cached(video: Video) -> Self {
    Self { video, stale: false }
  }

  pub fn rebuilt(video: Video) -> Self {
    Self { video, stale: true }
  }
}

#[async_trait]
pub trait VideoSource: Send + Sync {
  /// Produce the video for a hit, from cache or by fetching. `None` means the
  /// video is gone for good (deleted remotely and not cached); its index row
  /// is dropped by drift recovery.
  async fn video(&self, id: &str) -> Result<Option<SourcedVideo>>;

  /// Upload dates learned while materializing hits; playlist scopes use this
  /// to hydrate their snapshot.
  async fn record_uploaded(&self, _entries: &[(String, DateTime<Utc>)]) -> Result<()> {
    Ok(())
  }
}
