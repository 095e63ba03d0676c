//! Search scopes and their canonical cache keys.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The set of videos a single search is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
  /// Individual videos, searched in input order.
  Videos(Vec<String>),
  /// All (top N) videos of a playlist.
  Playlist { id: String, top: usize, cache_hours: u32 },
  /// The Uploads playlist of a channel, identified by any alias form.
  Channel { alias: String, top: usize, cache_hours: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
  Video,
  Playlist,
  Channel,
}

impl ScopeKind {
  pub fn prefix(&self) -> &'static str {
    match self {
      ScopeKind::Video => "video",
      ScopeKind::Playlist => "playlist",
      ScopeKind::Channel => "channel",
    }
  }
}

/// Canonical key a scope's state is persisted under: `<type>:<id>`.
/// Channel scopes are keyed by the resolved channel id, not the alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
  pub kind: ScopeKind,
  pub id: String,
}

impl ScopeKey {
  pub fn video(id: impl Into<String>) -> Self {
    Self {
      kind: ScopeKind::Video,
      id: id.into(),
    }
  }

  pub fn playlist(id: impl Into<String>) -> Self {
    Self {
      kind: ScopeKind::Playlist,
      id: id.into(),
    }
  }

  pub fn channel(id: impl Into<String>) -> Self {
    Self {
      kind: ScopeKind::Channel,
      id: id.into(),
    }
  }
}

impl std::fmt::Display for ScopeKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}", self.kind.prefix(), self.id)
  }
}

/// Extract a video id from a raw id or a watch/short URL.
pub fn parse_video_id(input: &str) -> Result<String> {
  let input = input.trim();
  if input.is_empty() {
    return Err(Error::Input("empty video id".to_string()));
  }

  let candidate = if let Some(rest) = input.split("watch?v=").nth(1) {
    rest.split(['&', '#']).next().unwrap_or_default()
  } else if let Some(rest) = input.split("youtu.be/").nth(1) {
    rest.split(['?', '&', '#']).next().unwrap_or_default()
  } else {
    input
  };

  if candidate.is_empty() || candidate.contains(['/', '?', '&', ' ']) {
    return Err(Error::Input(format!("not a video id or watch URL: {input}")));
  }
  Ok(candidate.to_string())
}

/// Extract a playlist id from a raw id or a playlist URL.
pub fn parse_playlist_id(input: &str) -> Result<String> {
  let input = input.trim();
  if input.is_empty() {
    return Err(Error::Input("empty playlist id".to_string()));
  }

  let candidate = if let Some(rest) = input.split("list=").nth(1) {
    rest.split(['&', '#']).next().unwrap_or_default()
  } else {
    input
  };

  if candidate.is_empty() || candidate.contains(['/', '?', '&', ' ']) {
    return Err(Error::Input(format!("not a playlist id or URL: {input}")));
  }
  Ok(candidate.to_string())
}

/// Normalize a channel alias: a handle, slug, user name or any URL thereof.
pub fn parse_channel_alias(input: &str) -> Result<String> {
  let input = input.trim().trim_end_matches('/');
  if input.is_empty() {
    return Err(Error::Input("empty channel alias".to_string()));
  }

  let candidate = input
    .rsplit('/')
    .next()
    .unwrap_or(input)
    .trim_start_matches('@')
    .to_string();

  if candidate.is_empty() || candidate.contains([' ', '?', '&']) {
    return Err(Error::Input(format!("not a channel alias or URL: {input}")));
  }
  Ok(candidate)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_scope_key_display() {
    assert_eq!(ScopeKey::video("abc").to_string(), "video:abc");
    assert_eq!(ScopeKey::playlist("PL123").to_string(), "playlist:PL123");
    assert_eq!(ScopeKey::channel("UC9").to_string(), "channel:UC9");
  }

  #[test]
  fn test_parse_video_id_forms() {
    assert_eq!(parse_video_id("dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
    assert_eq!(
      parse_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").unwrap(),
      "dQw4w9WgXcQ"
    );
    assert_eq!(parse_video_id("https://youtu.be/dQw4w9WgXcQ?si=x").unwrap(), "dQw4w9WgXcQ");
    assert!(parse_video_id("").is_err());
    assert!(parse_video_id("https://www.youtube.com/watch").is_err());
  }

  #[test]
  fn test_parse_playlist_id_forms() {
    assert_eq!(parse_playlist_id("PL0123").unwrap(), "PL0123");
    assert_eq!(
      parse_playlist_id("https://www.youtube.com/playlist?list=PL0123#top").unwrap(),
      "PL0123"
    );
    assert!(parse_playlist_id(" ").is_err());
  }

  #[test]
  fn test_parse_channel_alias_forms() {
    assert_eq!(parse_channel_alias("@somehandle").unwrap(), "somehandle");
    assert_eq!(parse_channel_alias("https://www.youtube.com/@somehandle/").unwrap(), "somehandle");
    assert_eq!(parse_channel_alias("somename").unwrap(), "somename");
    assert!(parse_channel_alias("").is_err());
  }
}
