//! The client interface the core consumes.
//!
//! The network implementation (scraper or API client) stays external; the
//! engine only depends on this trait. Implementations must be safe to share
//! behind an `Arc` and should return `Error::Network` for transient failures
//! so the retrying decorator can kick in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tubescan_core::{Caption, PlaylistEntry, Result};

/// What to enumerate: a plain playlist, or a channel's Uploads playlist
/// (the uploads lookup is part of the enumeration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistSource {
  Playlist(String),
  ChannelUploads(String),
}

impl PlaylistSource {
  pub fn id(&self) -> &str {
    match self {
      PlaylistSource::Playlist(id) | PlaylistSource::ChannelUploads(id) => id,
    }
  }
}

/// Video metadata as returned by the remote, without captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteVideo {
  pub id: String,
  pub title: String,
  pub description: String,
  pub keywords: Vec<String>,
  pub uploaded: DateTime<Utc>,
}

/// One entry of a video's caption-track manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
  pub video_id: String,
  pub language_name: String,
  pub url: String,
}

#[async_trait]
pub trait YouTubeClient: Send + Sync {
  /// Resolve a channel alias (handle, slug, user name, or any URL thereof)
  /// to its canonical channel id.
  async fn resolve_channel(&self, alias: &str) -> Result<String>;

  /// Lazily enumerate a playlist's videos in remote order.
  async fn playlist_videos(
    &self,
    source: &PlaylistSource,
    cancel: &CancellationToken,
  ) -> Result<BoxStream<'static, Result<PlaylistEntry>>>;

  async fn video(&self, id: &str, cancel: &CancellationToken) -> Result<RemoteVideo>;

  async fn caption_manifest(&self, video_id: &str, cancel: &CancellationToken) -> Result<Vec<TrackInfo>>;

  /// Download one track's timed captions. A track-level failure is an `Err`;
  /// the fetch layer records it on the track instead of failing the video.
  async fn captions(&self, track: &TrackInfo, cancel: &CancellationToken) -> Result<Vec<Caption>>;
}
