//! Per-scope search orchestration.
//!
//! A scope search moves through: resolve scope → load-or-refresh snapshot →
//! partition ids (indexed vs. unindexed) → run up to two branches (a search
//! over the already-indexed subset, and the fetch pipeline for the rest) →
//! drain. Both branches write into one result channel; the channel closes
//! when they complete, and a failure (including cancellation) is delivered as
//! the final item.

use std::sync::Arc;

use cache::Storage;
use futures::StreamExt;
use index::{SearchOrder, SearchRequest, SearchResult, VideoIndex};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tubescan_core::{Error, Result, Scope, ScopeKey};
use youtube::YouTubeClient;

use crate::fetch::load_or_fetch;
use crate::pipeline;
use crate::refresh::load_or_refresh;
use crate::resolve::resolve;
use crate::source::{EngineVideoSource, SnapshotHandle};

const RESULT_CHANNEL_CAPACITY: usize = 16;

/// Search parameters independent of the scope.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
  pub padding: usize,
  /// Explicit ordering; honored per branch on playlist-like scopes and
  /// ignored for video sets, which preserve input order.
  pub order_by: Option<SearchOrder>,
}

/// The search entry point over a cache directory and a client.
#[derive(Clone)]
pub struct SearchEngine {
  storage: Arc<Storage>,
  client: Arc<dyn YouTubeClient>,
}

impl SearchEngine {
  pub fn new(storage: Storage, client: Arc<dyn YouTubeClient>) -> Self {
    Self {
      storage: Arc::new(storage),
      client,
    }
  }

  pub fn storage(&self) -> &Storage {
    &self.storage
  }

  /// Run a search over one scope. Results stream out in production order as
  /// they become available; a failed search delivers its error as the final
  /// item. Dropping the receiver stops the work.
  pub fn search(
    &self,
    scope: Scope,
    query: impl Into<String>,
    options: SearchOptions,
    cancel: CancellationToken,
  ) -> mpsc::Receiver<Result<SearchResult>> {
    let (out, results) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
    let engine = self.clone();
    let query = query.into();

    tokio::spawn(async move {
      // Reject malformed queries before any network or index work.
      let run = match index::validate_query(&query) {
        Err(e) => Err(e),
        Ok(()) => match &scope {
          Scope::Videos(ids) => engine.run_videos(ids.clone(), &query, &options, &out, &cancel).await,
          Scope::Playlist { .. } | Scope::Channel { .. } => {
            engine.run_playlist_like(&scope, &query, &options, &out, &cancel).await
          }
        },
      };

      if let Err(e) = run {
        let _ = out.send(Err(e)).await;
      }
    });

    results
  }

  /// Playlist and channel scopes: one shared index, two branches.
  async fn run_playlist_like(
    &self,
    scope: &Scope,
    query: &str,
    options: &SearchOptions,
    out: &mpsc::Sender<Result<SearchResult>>,
    cancel: &CancellationToken,
  ) -> Result<()> {
    let resolved = resolve(&self.storage, &*self.client, scope).await?;
    let snapshot = load_or_refresh(&self.storage, &*self.client, &resolved, cancel).await?;

    let relevant = snapshot.top_ids(resolved.top);
    let index = Arc::new(VideoIndex::open_or_create(self.storage.index_path(&resolved.key)).await?);
    let indexed = index.indexed_ids(&relevant).await?;
    let unindexed: Vec<String> = relevant.iter().filter(|id| !indexed.contains(*id)).cloned().collect();
    info!(
      scope = %resolved.key,
      relevant = relevant.len(),
      indexed = indexed.len(),
      unindexed = unindexed.len(),
      "scope partitioned"
    );

    let handle = Arc::new(SnapshotHandle {
      key: resolved.key.clone(),
      snapshot: tokio::sync::Mutex::new(snapshot),
    });
    let source = Arc::new(
      EngineVideoSource::new(self.storage.clone(), self.client.clone(), cancel.clone()).with_snapshot(handle),
    );

    let base_request = request_for(query, options);
    let mut branches = JoinSet::new();

    if !indexed.is_empty() {
      let request = base_request.clone().restricted_to(indexed);
      let index = index.clone();
      let source = source.clone();
      let out = out.clone();
      let cancel = cancel.clone();
      branches.spawn(async move {
        let results = tokio::select! {
          biased;
          _ = cancel.cancelled() => return Err(Error::Cancelled),
          results = index.search(&request, &*source) => results?,
        };
        for result in results {
          if out.send(Ok(result)).await.is_err() {
            break;
          }
        }
        Ok(())
      });
    }

    if !unindexed.is_empty() {
      branches.spawn(pipeline::run_unindexed(
        unindexed,
        index.clone(),
        self.storage.clone(),
        self.client.clone(),
        source.clone(),
        base_request,
        out.clone(),
        cancel.clone(),
      ));
    }

    let mut failure = None;
    while let Some(joined) = branches.join_next().await {
      match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
          failure.get_or_insert(e);
        }
        Err(e) => {
          failure.get_or_insert(Error::Other(format!("search branch panicked: {e}")));
        }
      }
    }

    match failure {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }

  /// Video-set scopes: one per-video index each, emitted in input order.
  async fn run_videos(
    &self,
    ids: Vec<String>,
    query: &str,
    options: &SearchOptions,
    out: &mpsc::Sender<Result<SearchResult>>,
    cancel: &CancellationToken,
  ) -> Result<()> {
    // Ordering is input order by contract; order_by is not applied here.
    let base_request = SearchRequest::new(query).padded(options.padding);

    let mut searches = futures::stream::iter(ids.into_iter().map(|id| {
      let engine = self.clone();
      let request = base_request.clone();
      let cancel = cancel.clone();
      async move { engine.search_single_video(id, request, cancel).await }
    }))
    .buffered(pipeline::FETCH_CONCURRENCY);

    while let Some(searched) = searches.next().await {
      for result in searched? {
        if out.send(Ok(result)).await.is_err() {
          return Ok(());
        }
      }
    }
    Ok(())
  }

  async fn search_single_video(
    &self,
    id: String,
    base_request: SearchRequest,
    cancel: CancellationToken,
  ) -> Result<Vec<SearchResult>> {
    if cancel.is_cancelled() {
      return Err(Error::Cancelled);
    }

    let key = ScopeKey::video(id.clone());
    let index = VideoIndex::open_or_create(self.storage.index_path(&key)).await?;

    if index.is_empty().await {
      let (video, _fresh) = load_or_fetch(&self.storage, &*self.client, &id, &cancel).await?;
      index.begin_batch().await?;
      index.add(&video).await?;
      index.commit_batch().await?;
      index.save().await?;
      debug!(video = %id, "single-video index built");
    }

    let source = EngineVideoSource::new(self.storage.clone(), self.client.clone(), cancel);
    let request = base_request.restricted_to([id]);
    index.search(&request, &source).await
  }
}

fn request_for(query: &str, options: &SearchOptions) -> SearchRequest {
  let mut request = SearchRequest::new(query).padded(options.padding);
  if let Some(order) = options.order_by {
    request = request.ordered_by(order);
  }
  request
}
