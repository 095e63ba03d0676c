//! Scope resolution: canonical scope keys and cached channel alias lookup.

use cache::Storage;
use tracing::debug;
use tubescan_core::{Error, Result, Scope, ScopeKey};
use youtube::{PlaylistSource, YouTubeClient};

/// A playlist-like scope with its canonical key and remote source.
#[derive(Debug, Clone)]
pub struct ResolvedScope {
  pub key: ScopeKey,
  pub source: PlaylistSource,
  pub top: usize,
  pub cache_hours: u32,
}

/// Resolve a playlist or channel scope. Channel aliases are mapped to their
/// canonical channel id once; the mapping is cached at `alias:<alias>`.
pub async fn resolve(storage: &Storage, client: &dyn YouTubeClient, scope: &Scope) -> Result<ResolvedScope> {
  match scope {
    Scope::Playlist { id, top, cache_hours } => Ok(ResolvedScope {
      key: ScopeKey::playlist(id.clone()),
      source: PlaylistSource::Playlist(id.clone()),
      top: *top,
      cache_hours: *cache_hours,
    }),
    Scope::Channel { alias, top, cache_hours } => {
      let channel_id = resolve_alias(storage, client, alias).await?;
      Ok(ResolvedScope {
        key: ScopeKey::channel(channel_id.clone()),
        source: PlaylistSource::ChannelUploads(channel_id),
        top: *top,
        cache_hours: *cache_hours,
      })
    }
    Scope::Videos(_) => Err(Error::Input("video sets have no playlist scope".to_string())),
  }
}

async fn resolve_alias(storage: &Storage, client: &dyn YouTubeClient, alias: &str) -> Result<String> {
  let key = Storage::alias_key(alias);
  if let Some(channel_id) = storage.channels.get::<String>(&key).await? {
    return Ok(channel_id);
  }

  let channel_id = client.resolve_channel(alias).await?;
  storage.channels.set(&key, &channel_id).await?;
  debug!(alias, channel = %channel_id, "channel alias resolved");
  Ok(channel_id)
}
