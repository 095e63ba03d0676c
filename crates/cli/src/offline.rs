//! Cache-only client: every remote operation fails with a pointer to the
//! pluggable client seam. Searches over fully cached scopes never reach it.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tubescan_core::{Caption, Error, PlaylistEntry, Result};
use youtube::{PlaylistSource, RemoteVideo, TrackInfo, YouTubeClient};

pub struct OfflineClient;

fn offline(operation: &str) -> Error {
  Error::Other(format!(
    "{operation} needs network access, but no YouTube client is configured; \
     only cached scopes can be searched (raise --cache-hours to keep using a cached playlist)"
  ))
}

#[async_trait]
impl YouTubeClient for OfflineClient {
  async fn resolve_channel(&self, alias: &str) -> Result<String> {
    Err(offline(&format!("resolving channel alias {alias}")))
  }

  async fn playlist_videos(
    &self,
    source: &PlaylistSource,
    _cancel: &CancellationToken,
  ) -> Result<BoxStream<'static, Result<PlaylistEntry>>> {
    Err(offline(&format!("enumerating {}", source.id())))
  }

  async fn video(&self, id: &str, _cancel: &CancellationToken) -> Result<RemoteVideo> {
    Err(offline(&format!("fetching video {id}")))
  }

  async fn caption_manifest(&self, video_id: &str, _cancel: &CancellationToken) -> Result<Vec<TrackInfo>> {
    Err(offline(&format!("fetching caption manifest of {video_id}")))
  }

  async fn captions(&self, track: &TrackInfo, _cancel: &CancellationToken) -> Result<Vec<Caption>> {
    Err(offline(&format!("downloading {} captions", track.language_name)))
  }
}
