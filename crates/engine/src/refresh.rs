//! Playlist snapshot loading and refresh.

use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tubescan_core::{PlaylistEntry, PlaylistSnapshot, Result};
use youtube::YouTubeClient;

use cache::Storage;

use crate::resolve::ResolvedScope;

/// Load the scope's snapshot, refreshing from the remote when it is missing,
/// stale, or knows fewer ids than the search wants. The refresh takes the
/// first `top` entries of the remote stream and merges them ahead of the
/// previously-known ids.
pub async fn load_or_refresh(
  storage: &Storage,
  client: &dyn YouTubeClient,
  resolved: &ResolvedScope,
  cancel: &CancellationToken,
) -> Result<PlaylistSnapshot> {
  let store = storage.store_for(resolved.key.kind);
  let key = resolved.key.to_string();
  let now = Utc::now();

  let mut snapshot = store
    .get::<PlaylistSnapshot>(&key)
    .await?
    .unwrap_or_else(|| PlaylistSnapshot::empty(now));

  if snapshot.needs_refresh(resolved.cache_hours, resolved.top, now) {
    debug!(scope = %resolved.key, top = resolved.top, "refreshing playlist");
    let stream = client.playlist_videos(&resolved.source, cancel).await?;
    let remote: Vec<PlaylistEntry> = stream.take(resolved.top).try_collect().await?;
    snapshot.apply_refresh(remote, now);
    store.set(&key, &snapshot).await?;
  }

  Ok(snapshot)
}
