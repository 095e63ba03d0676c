//! Loading a video from the cache, or fetching and persisting it.

use cache::Storage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tubescan_core::{CaptionTrack, Error, Result, TrackError, Video};
use youtube::YouTubeClient;

/// Cache-get the video, falling back to the client on a miss: metadata,
/// caption manifest, then each track's captions (a failed track records its
/// error instead of failing the video). The result is sanitized and, when
/// fetched, persisted.
///
/// The boolean is `true` when the blob had to be (re)built, which is the
/// drift signal for searches that already had the video indexed.
pub async fn load_or_fetch(
  storage: &Storage,
  client: &dyn YouTubeClient,
  id: &str,
  cancel: &CancellationToken,
) -> Result<(Video, bool)> {
  let key = Storage::video_key(id);

  if let Some(mut video) = storage.videos.get::<Video>(&key).await? {
    video.sanitize();
    return Ok((video, false));
  }

  if cancel.is_cancelled() {
    return Err(Error::Cancelled);
  }

  let remote = client.video(id, cancel).await?;
  let manifest = client.caption_manifest(id, cancel).await?;

  let mut tracks = Vec::with_capacity(manifest.len());
  for info in manifest {
    match client.captions(&info, cancel).await {
      Ok(captions) => tracks.push(CaptionTrack::new(info.language_name, info.url, captions)),
      Err(Error::Cancelled) => return Err(Error::Cancelled),
      Err(e) => {
        warn!(video = id, language = %info.language_name, error = %e, "caption track failed");
        tracks.push(CaptionTrack::failed(
          info.language_name,
          info.url,
          TrackError {
            message: e.to_string(),
            details: None,
          },
        ));
      }
    }
  }

  let mut video = Video {
    id: remote.id,
    title: remote.title,
    description: remote.description,
    keywords: remote.keywords,
    uploaded: remote.uploaded,
    caption_tracks: tracks,
  };
  video.sanitize();
  storage.videos.set(&key, &video).await?;
  debug!(video = id, tracks = video.caption_tracks.len(), "video fetched");

  Ok((video, true))
}
