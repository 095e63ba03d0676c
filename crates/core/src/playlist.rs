//! Persisted playlist snapshots.
//!
//! A snapshot is the locally-known view of a playlist-like scope: the ordered
//! video ids as last observed remotely, any known upload dates, and the time
//! of the last refresh. Ids that disappear remotely are retained at the tail
//! so locally cached videos stay searchable.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uploaded: Option<DateTime<Utc>>,
}

impl PlaylistEntry {
  pub fn new(id: impl Into<String>, uploaded: Option<DateTime<Utc>>) -> Self {
    Self {
      id: id.into(),
      uploaded,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
  pub loaded: DateTime<Utc>,
  pub videos: Vec<PlaylistEntry>,
}

impl PlaylistSnapshot {
  pub fn empty(now: DateTime<Utc>) -> Self {
    Self {
      loaded: now,
      videos: Vec::new(),
    }
  }

  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.videos.iter().map(|v| v.id.as_str())
  }

  /// The head of the ordered id set considered for a search.
  pub fn top_ids(&self, top: usize) -> Vec<String> {
    self.videos.iter().take(top).map(|v| v.id.clone()).collect()
  }

  pub fn uploaded(&self, id: &str) -> Option<DateTime<Utc>> {
    self.videos.iter().find(|v| v.id == id).and_then(|v| v.uploaded)
  }

  /// Record an upload date learned after the fact (hydration during search).
  /// Returns whether the snapshot changed.
  pub fn set_uploaded(&mut self, id: &str, uploaded: DateTime<Utc>) -> bool {
    match self.videos.iter_mut().find(|v| v.id == id) {
      Some(entry) if entry.uploaded != Some(uploaded) => {
        entry.uploaded = Some(uploaded);
        true
      }
      _ => false,
    }
  }

  /// Whether a refresh is due: never loaded enough ids, or the snapshot is
  /// older than the freshness window.
  pub fn needs_refresh(&self, cache_hours: u32, top: usize, now: DateTime<Utc>) -> bool {
    self.videos.len() < top || self.loaded + Duration::hours(i64::from(cache_hours)) < now
  }

  /// Apply a refresh: the refreshed ids take the remote order at the head,
  /// previously-known ids missing from the refresh are appended in their
  /// prior order, and prior upload dates are preserved where the remote did
  /// not supply one.
  pub fn apply_refresh(&mut self, remote: Vec<PlaylistEntry>, now: DateTime<Utc>) {
    let prior = std::mem::take(&mut self.videos);

    let mut videos: Vec<PlaylistEntry> = Vec::with_capacity(prior.len().max(remote.len()));
    for entry in remote {
      let uploaded = entry
        .uploaded
        .or_else(|| prior.iter().find(|p| p.id == entry.id).and_then(|p| p.uploaded));
      videos.push(PlaylistEntry::new(entry.id, uploaded));
    }
    for entry in prior {
      if !videos.iter().any(|v| v.id == entry.id) {
        videos.push(entry);
      }
    }

    self.videos = videos;
    self.loaded = now;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
  }

  #[test]
  fn test_refresh_merge_keeps_prior_tail_and_dates() {
    let mut snapshot = PlaylistSnapshot {
      loaded: date(1),
      videos: vec![
        PlaylistEntry::new("A", Some(date(10))),
        PlaylistEntry::new("B", None),
        PlaylistEntry::new("C", None),
      ],
    };

    snapshot.apply_refresh(
      vec![
        PlaylistEntry::new("X", None),
        PlaylistEntry::new("A", None),
        PlaylistEntry::new("Y", Some(date(20))),
      ],
      date(2),
    );

    let ids: Vec<_> = snapshot.ids().collect();
    assert_eq!(ids, vec!["X", "A", "Y", "B", "C"]);
    assert_eq!(snapshot.uploaded("A"), Some(date(10)));
    assert_eq!(snapshot.uploaded("Y"), Some(date(20)));
    assert_eq!(snapshot.loaded, date(2));
  }

  #[test]
  fn test_refresh_remote_date_wins_over_missing() {
    let mut snapshot = PlaylistSnapshot {
      loaded: date(1),
      videos: vec![PlaylistEntry::new("A", None)],
    };
    snapshot.apply_refresh(vec![PlaylistEntry::new("A", Some(date(5)))], date(2));
    assert_eq!(snapshot.uploaded("A"), Some(date(5)));
  }

  #[test]
  fn test_needs_refresh_on_age_and_size() {
    let snapshot = PlaylistSnapshot {
      loaded: date(1),
      videos: vec![PlaylistEntry::new("A", None), PlaylistEntry::new("B", None)],
    };

    // Too few known ids for the requested top.
    assert!(snapshot.needs_refresh(24, 3, date(1)));
    // Fresh enough and enough ids.
    assert!(!snapshot.needs_refresh(24, 2, date(1)));
    // Older than the freshness window.
    assert!(snapshot.needs_refresh(24, 2, date(3)));
  }

  #[test]
  fn test_set_uploaded_reports_change() {
    let mut snapshot = PlaylistSnapshot {
      loaded: date(1),
      videos: vec![PlaylistEntry::new("A", None)],
    };

    assert!(snapshot.set_uploaded("A", date(4)));
    assert!(!snapshot.set_uploaded("A", date(4)));
    assert!(!snapshot.set_uploaded("unknown", date(4)));
  }

  #[test]
  fn test_top_ids_takes_head() {
    let snapshot = PlaylistSnapshot {
      loaded: date(1),
      videos: vec![
        PlaylistEntry::new("A", None),
        PlaylistEntry::new("B", None),
        PlaylistEntry::new("C", None),
      ],
    };
    assert_eq!(snapshot.top_ids(2), vec!["A".to_string(), "B".to_string()]);
  }
}
