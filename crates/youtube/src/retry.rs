// Retrying decorator around any client.
//
// Transient network failures are retried with exponential backoff before they
// surface; everything else propagates immediately. Backoff sleeps observe the
// cancellation token.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tubescan_core::{Caption, Error, PlaylistEntry, Result};

use crate::client::{PlaylistSource, RemoteVideo, TrackInfo, YouTubeClient};

#[derive(Debug, Clone)]
pub struct RetryConfig {
  /// Retries after the first attempt.
  pub max_retries: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
  pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_retries: 3,
      initial_backoff: Duration::from_millis(500),
      max_backoff: Duration::from_secs(30),
      backoff_multiplier: 2.0,
    }
  }
}

impl RetryConfig {
  pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
    let base = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
    Duration::from_secs_f64(base.min(self.max_backoff.as_secs_f64()))
  }
}

/// Wraps a client with retry-on-transient-failure semantics.
pub struct RetryingClient<C> {
  inner: C,
  config: RetryConfig,
}

impl<C: YouTubeClient> RetryingClient<C> {
  pub fn new(client: C) -> Self {
    Self {
      inner: client,
      config: RetryConfig::default(),
    }
  }

  pub fn with_config(client: C, config: RetryConfig) -> Self {
    Self { inner: client, config }
  }

  async fn retrying<T, Fut, F>(&self, what: &str, cancel: &CancellationToken, mut call: F) -> Result<T>
  where
    Fut: Future<Output = Result<T>>,
    F: FnMut() -> Fut,
  {
    let mut attempt = 0;
    loop {
      match call().await {
        Ok(value) => return Ok(value),
        Err(e) if e.is_transient() && attempt < self.config.max_retries => {
          let backoff = self.config.backoff_for_attempt(attempt);
          attempt += 1;
          warn!(what, attempt, backoff_ms = backoff.as_millis() as u64, error = %e, "transient failure, retrying");
          tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = sleep(backoff) => {}
          }
        }
        Err(e) => {
          debug!(what, attempt, error = %e, "giving up");
          return Err(e);
        }
      }
    }
  }
}

#[async_trait]
impl<C: YouTubeClient> YouTubeClient for RetryingClient<C> {
  async fn resolve_channel(&self, alias: &str) -> Result<String> {
    let cancel = CancellationToken::new();
    self
      .retrying("resolve_channel", &cancel, || self.inner.resolve_channel(alias))
      .await
  }

  async fn playlist_videos(
    &self,
    source: &PlaylistSource,
    cancel: &CancellationToken,
  ) -> Result<BoxStream<'static, Result<PlaylistEntry>>> {
    // Only the initial page request is retried here; failures mid-stream
    // surface to the consumer.
    self
      .retrying("playlist_videos", cancel, || self.inner.playlist_videos(source, cancel))
      .await
  }

  async fn video(&self, id: &str, cancel: &CancellationToken) -> Result<RemoteVideo> {
    self.retrying("video", cancel, || self.inner.video(id, cancel)).await
  }

  async fn caption_manifest(&self, video_id: &str, cancel: &CancellationToken) -> Result<Vec<TrackInfo>> {
    self
      .retrying("caption_manifest", cancel, || self.inner.caption_manifest(video_id, cancel))
      .await
  }

  async fn captions(&self, track: &TrackInfo, cancel: &CancellationToken) -> Result<Vec<Caption>> {
    self
      .retrying("captions", cancel, || self.inner.captions(track, cancel))
      .await
  }
}
