//! Shared test fixtures: an in-memory YouTube client and cache scaffolding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tubescan_core::{Caption, Error, PlaylistEntry, Result};
use youtube::{PlaylistSource, RemoteVideo, TrackInfo, YouTubeClient};

#[derive(Default)]
pub struct FakeClient {
  pub videos: HashMap<String, RemoteVideo>,
  /// video id → (language, captions)
  pub captions: HashMap<String, Vec<(String, Vec<Caption>)>>,
  /// playlist or channel id → remote entries in remote order
  pub playlists: HashMap<String, Vec<PlaylistEntry>>,
  pub aliases: HashMap<String, String>,
  /// Video ids whose caption downloads fail.
  pub broken_captions: std::collections::HashSet<String>,
  pub fetch_delay: Duration,

  pub video_calls: AtomicU64,
  pub playlist_calls: AtomicU64,
  in_flight: AtomicI64,
  pub max_in_flight: AtomicI64,
}

impl FakeClient {
  pub fn date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap()
  }

  /// Register a video with one English caption track.
  pub fn add_video(&mut self, id: &str, title: &str, uploaded_day: u32, captions: &[(u32, &str)]) {
    self.videos.insert(
      id.to_string(),
      RemoteVideo {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("description of {id}"),
        keywords: Vec::new(),
        uploaded: Self::date(uploaded_day),
      },
    );
    self.captions.insert(
      id.to_string(),
      vec![(
        "English".to_string(),
        captions
          .iter()
          .map(|&(at, text)| Caption {
            at,
            text: text.to_string(),
          })
          .collect(),
      )],
    );
  }

  pub fn add_playlist(&mut self, id: &str, video_ids: &[&str]) {
    self.playlists.insert(
      id.to_string(),
      video_ids.iter().map(|v| PlaylistEntry::new(v.to_string(), None)).collect(),
    );
  }
}

#[async_trait]
impl YouTubeClient for FakeClient {
  async fn resolve_channel(&self, alias: &str) -> Result<String> {
    self.aliases.get(alias).cloned().ok_or_else(|| Error::RemoteNotFound {
      entity: "channel",
      id: alias.to_string(),
    })
  }

  async fn playlist_videos(
    &self,
    source: &PlaylistSource,
    _cancel: &CancellationToken,
  ) -> Result<BoxStream<'static, Result<PlaylistEntry>>> {
    self.playlist_calls.fetch_add(1, Ordering::SeqCst);
    let entries = self.playlists.get(source.id()).cloned().ok_or_else(|| Error::RemoteNotFound {
      entity: "playlist",
      id: source.id().to_string(),
    })?;
    Ok(futures::stream::iter(entries.into_iter().map(Ok)).boxed())
  }

  async fn video(&self, id: &str, cancel: &CancellationToken) -> Result<RemoteVideo> {
    self.video_calls.fetch_add(1, Ordering::SeqCst);
    let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

    if !self.fetch_delay.is_zero() {
      tokio::select! {
        _ = cancel.cancelled() => {
          self.in_flight.fetch_sub(1, Ordering::SeqCst);
          return Err(Error::Cancelled);
        }
        _ = tokio::time::sleep(self.fetch_delay) => {}
      }
    }
    self.in_flight.fetch_sub(1, Ordering::SeqCst);

    self.videos.get(id).cloned().ok_or_else(|| Error::RemoteNotFound {
      entity: "video",
      id: id.to_string(),
    })
  }

  async fn caption_manifest(&self, video_id: &str, _cancel: &CancellationToken) -> Result<Vec<TrackInfo>> {
    Ok(
      self
        .captions
        .get(video_id)
        .map(|tracks| {
          tracks
            .iter()
            .map(|(language, _)| TrackInfo {
              video_id: video_id.to_string(),
              language_name: language.clone(),
              url: format!("http://example.test/{video_id}/{language}"),
            })
            .collect()
        })
        .unwrap_or_default(),
    )
  }

  async fn captions(&self, track: &TrackInfo, _cancel: &CancellationToken) -> Result<Vec<Caption>> {
    if self.broken_captions.contains(&track.video_id) {
      return Err(Error::Network("caption download failed".to_string()));
    }
    self
      .captions
      .get(&track.video_id)
      .and_then(|tracks| tracks.iter().find(|(language, _)| *language == track.language_name))
      .map(|(_, captions)| captions.clone())
      .ok_or_else(|| Error::Network("caption track gone".to_string()))
  }
}

/// Drain a result stream into the Ok results and the final error, if any.
pub async fn drain(
  mut results: tokio::sync::mpsc::Receiver<Result<engine::SearchResult>>,
) -> (Vec<engine::SearchResult>, Option<Error>) {
  let mut ok = Vec::new();
  let mut failure = None;
  while let Some(item) = results.recv().await {
    match item {
      Ok(result) => ok.push(result),
      Err(e) => failure = Some(e),
    }
  }
  (ok, failure)
}
