//! Concurrent fetch/index/search pipeline for uncached videos.
//!
//! ```text
//! ids → fetch fan-out (≤5 in flight) → bounded channel (5) → batch consumer
//!                                                             commit + save
//!                                                             batch search →
//! ```
//!
//! Fetch permits are released only after the fetched video is accepted into
//! the channel, so the channel capacity backpressures the fan-out. The single
//! consumer is the index's only writer: it accumulates an uncommitted batch
//! and flushes (commit, save, uploaded callback, batch-restricted search)
//! when the batch is full, the channel runs empty, or the producer completes.
//! On cancellation the current batch is committed and saved best-effort so
//! progress is preserved.

use std::sync::Arc;

use cache::Storage;
use index::{SearchRequest, VideoIndex, VideoSource};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tubescan_core::{Error, Result, Video};
use youtube::YouTubeClient;

use crate::fetch::load_or_fetch;
use crate::source::EngineVideoSource;

pub(crate) const FETCH_CONCURRENCY: usize = 5;
pub(crate) const FETCH_CHANNEL_CAPACITY: usize = 5;
pub(crate) const BATCH_SIZE: usize = 5;

/// Fetch, index and search the scope's unindexed videos, emitting results
/// through `out` as each batch becomes searchable.
pub async fn run_unindexed(
  ids: Vec<String>,
  index: Arc<VideoIndex>,
  storage: Arc<Storage>,
  client: Arc<dyn YouTubeClient>,
  source: Arc<EngineVideoSource>,
  base_request: SearchRequest,
  out: mpsc::Sender<Result<index::SearchResult>>,
  cancel: CancellationToken,
) -> Result<()> {
  if ids.is_empty() {
    return Ok(());
  }
  debug!(unindexed = ids.len(), "starting fetch pipeline");

  let (tx, rx) = mpsc::channel::<Result<Video>>(FETCH_CHANNEL_CAPACITY);
  let gate = Arc::new(Semaphore::new(FETCH_CONCURRENCY));

  let producer_cancel = cancel.clone();
  let producer = tokio::spawn(async move {
    for id in ids {
      let permit = tokio::select! {
        biased;
        _ = producer_cancel.cancelled() => break,
        permit = gate.clone().acquire_owned() => match permit {
          Ok(permit) => permit,
          Err(_) => break,
        },
      };

      let tx = tx.clone();
      let storage = storage.clone();
      let client = client.clone();
      let fetch_cancel = producer_cancel.clone();
      tokio::spawn(async move {
        let fetched = tokio::select! {
          biased;
          _ = fetch_cancel.cancelled() => return,
          fetched = load_or_fetch(&storage, &*client, &id, &fetch_cancel) => fetched,
        };
        let _ = tx.send(fetched.map(|(video, _fresh)| video)).await;
        // Accepted into the channel (or the consumer is gone); only now may
        // the next fetch start.
        drop(permit);
      });
    }
  });

  let consumed = consume(rx, &index, &source, &base_request, &out, &cancel).await;
  producer.abort();
  consumed
}

/// Single consumer: reads fetched videos in arrival order and maintains the
/// uncommitted batch.
async fn consume(
  mut rx: mpsc::Receiver<Result<Video>>,
  index: &VideoIndex,
  source: &EngineVideoSource,
  base_request: &SearchRequest,
  out: &mpsc::Sender<Result<index::SearchResult>>,
  cancel: &CancellationToken,
) -> Result<()> {
  let mut batch: Vec<Video> = Vec::new();

  let outcome = loop {
    if cancel.is_cancelled() {
      break Err(Error::Cancelled);
    }

    match rx.try_recv() {
      Ok(fetched) => {
        if let Err(e) = accept(index, &mut batch, fetched).await {
          break Err(e);
        }
        if batch.len() >= BATCH_SIZE
          && let Err(e) = flush(index, source, base_request, &mut batch, out).await
        {
          break Err(e);
        }
      }
      Err(mpsc::error::TryRecvError::Empty) => {
        // No video queued: make what we have searchable before waiting.
        if !batch.is_empty()
          && let Err(e) = flush(index, source, base_request, &mut batch, out).await
        {
          break Err(e);
        }

        tokio::select! {
          biased;
          _ = cancel.cancelled() => break Err(Error::Cancelled),
          received = rx.recv() => match received {
            Some(fetched) => {
              if let Err(e) = accept(index, &mut batch, fetched).await {
                break Err(e);
              }
              if batch.len() >= BATCH_SIZE
                && let Err(e) = flush(index, source, base_request, &mut batch, out).await
              {
                break Err(e);
              }
            }
            None => break Ok(()),
          },
        }
      }
      Err(mpsc::error::TryRecvError::Disconnected) => break Ok(()),
    }
  };

  match outcome {
    Ok(()) => {
      if !batch.is_empty() {
        flush(index, source, base_request, &mut batch, out).await?;
      }
      Ok(())
    }
    Err(e) => {
      // Preserve progress: commit and save what was already indexed before
      // surfacing the failure.
      if !batch.is_empty() {
        if let Err(save_error) = commit_and_save(index).await {
          warn!(error = %save_error, "failed to save batch while aborting");
        }
        batch.clear();
      }
      Err(e)
    }
  }
}

/// Index one fetched video into the open batch.
async fn accept(index: &VideoIndex, batch: &mut Vec<Video>, fetched: Result<Video>) -> Result<()> {
  let video = fetched?;
  if batch.is_empty() {
    index.begin_batch().await?;
  }
  index.replace(&video).await?;
  batch.push(video);
  Ok(())
}

async fn commit_and_save(index: &VideoIndex) -> Result<()> {
  index.commit_batch().await?;
  index.save().await
}

/// Commit and persist the batch, hydrate upload dates, then search the index
/// restricted to the batch and emit its matches.
async fn flush(
  index: &VideoIndex,
  source: &EngineVideoSource,
  base_request: &SearchRequest,
  batch: &mut Vec<Video>,
  out: &mpsc::Sender<Result<index::SearchResult>>,
) -> Result<()> {
  commit_and_save(index).await?;

  let uploaded: Vec<_> = batch.iter().map(|v| (v.id.clone(), v.uploaded)).collect();
  source.record_uploaded(&uploaded).await?;

  let request = base_request.clone().restricted_to(batch.iter().map(|v| v.id.clone()));
  let results = index.search(&request, source).await?;
  debug!(batch = batch.len(), matches = results.len(), "batch searchable");

  for result in results {
    if out.send(Ok(result)).await.is_err() {
      // Receiver dropped: the caller stopped consuming.
      return Err(Error::Cancelled);
    }
  }

  batch.clear();
  Ok(())
}
