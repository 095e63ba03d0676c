//! Video, caption track and caption entities plus the derived track full text.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timed caption line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caption {
  /// Seconds from the start of the video.
  pub at: u32,
  pub text: String,
}

/// Failure details for a caption track that could not be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackError {
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

/// A caption track in one language, either with its captions or with the
/// error that prevented downloading them.
#[derive(Debug, Serialize, Deserialize)]
pub struct CaptionTrack {
  /// Free-form display label; doubles as the field discriminator inside the
  /// index (`<language_name>_Captions`).
  pub language_name: String,
  pub source_url: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub captions: Vec<Caption>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<TrackError>,

  #[serde(skip)]
  full_text: OnceLock<TrackText>,
}

/// The concatenated text of a caption track together with the start offset of
/// each caption inside it. Offsets index into `text` in bytes; captions whose
/// text is whitespace-only are not represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackText {
  pub text: String,
  /// `(byte offset in text, index into CaptionTrack::captions)`, ascending.
  pub starts: Vec<(usize, usize)>,
}

/// Separator between caption texts in the track full text. There is no
/// leading separator; its length counts only between captions.
pub const CAPTION_SEPARATOR: &str = " ";

/// Collapse all whitespace runs to a single space.
pub fn normalize_whitespace(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl CaptionTrack {
  pub fn new(language_name: impl Into<String>, source_url: impl Into<String>, captions: Vec<Caption>) -> Self {
    Self {
      language_name: language_name.into(),
      source_url: source_url.into(),
      captions,
      error: None,
      full_text: OnceLock::new(),
    }
  }

  pub fn failed(language_name: impl Into<String>, source_url: impl Into<String>, error: TrackError) -> Self {
    Self {
      language_name: language_name.into(),
      source_url: source_url.into(),
      captions: Vec::new(),
      error: Some(error),
      full_text: OnceLock::new(),
    }
  }

  /// Dedupe captions by `(at, text)` and sort ascending by `at`.
  /// Applied whenever a video is loaded from the cache or fetched.
  pub fn sanitize(&mut self) {
    self
      .captions
      .sort_by(|a, b| a.at.cmp(&b.at).then_with(|| a.text.cmp(&b.text)));
    self.captions.dedup();
    self.full_text = OnceLock::new();
  }

  /// The concatenated track text and offset map, computed once per track
  /// instance. Safe under concurrent access.
  pub fn full_text(&self) -> &TrackText {
    self.full_text.get_or_init(|| build_track_text(&self.captions))
  }
}

fn build_track_text(captions: &[Caption]) -> TrackText {
  let mut text = String::new();
  let mut starts = Vec::new();

  for (i, caption) in captions.iter().enumerate() {
    let normalized = normalize_whitespace(&caption.text);
    if normalized.is_empty() {
      continue;
    }
    if !text.is_empty() {
      text.push_str(CAPTION_SEPARATOR);
    }
    starts.push((text.len(), i));
    text.push_str(&normalized);
  }

  TrackText { text, starts }
}

impl Clone for CaptionTrack {
  fn clone(&self) -> Self {
    Self {
      language_name: self.language_name.clone(),
      source_url: self.source_url.clone(),
      captions: self.captions.clone(),
      error: self.error.clone(),
      full_text: OnceLock::new(),
    }
  }
}

impl PartialEq for CaptionTrack {
  fn eq(&self, other: &Self) -> bool {
    self.language_name == other.language_name
      && self.source_url == other.source_url
      && self.captions == other.captions
      && self.error == other.error
  }
}

/// A YouTube video with its metadata and caption tracks.
///
/// Persisted as one JSON blob keyed `video:<id>`; immutable after persist
/// except for caption sanitization on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
  pub id: String,
  pub title: String,
  pub description: String,
  pub keywords: Vec<String>,
  pub uploaded: DateTime<Utc>,
  #[serde(default)]
  pub caption_tracks: Vec<CaptionTrack>,
}

impl Video {
  pub fn sanitize(&mut self) {
    for track in &mut self.caption_tracks {
      track.sanitize();
    }
  }

  /// Tracks that actually carry captions (failed tracks are kept for
  /// reporting but never indexed).
  pub fn indexable_tracks(&self) -> impl Iterator<Item = &CaptionTrack> {
    self.caption_tracks.iter().filter(|t| !t.captions.is_empty())
  }

  pub fn track_by_language(&self, language_name: &str) -> Option<&CaptionTrack> {
    self.caption_tracks.iter().find(|t| t.language_name == language_name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn caption(at: u32, text: &str) -> Caption {
    Caption {
      at,
      text: text.to_string(),
    }
  }

  #[test]
  fn test_full_text_joins_with_single_space() {
    let track = CaptionTrack::new(
      "English",
      "http://example.test/track",
      vec![caption(0, "hello world"), caption(2, "this is"), caption(4, "a test")],
    );

    let full = track.full_text();
    assert_eq!(full.text, "hello world this is a test");
    assert_eq!(full.starts, vec![(0, 0), (12, 1), (20, 2)]);
  }

  #[test]
  fn test_full_text_skips_whitespace_only_and_normalizes() {
    let track = CaptionTrack::new(
      "English",
      "http://example.test/track",
      vec![
        caption(0, "first  line"),
        caption(1, " \n "),
        caption(2, "second\tline\n"),
      ],
    );

    let full = track.full_text();
    assert_eq!(full.text, "first line second line");
    // The whitespace-only caption at index 1 has no start offset.
    assert_eq!(full.starts, vec![(0, 0), (11, 2)]);
  }

  #[test]
  fn test_full_text_is_memoized() {
    let track = CaptionTrack::new("English", "url", vec![caption(0, "once")]);
    let first = track.full_text() as *const TrackText;
    let second = track.full_text() as *const TrackText;
    assert_eq!(first, second);
  }

  #[test]
  fn test_sanitize_dedupes_and_sorts() {
    let mut track = CaptionTrack::new(
      "English",
      "url",
      vec![
        caption(4, "later"),
        caption(0, "first"),
        caption(4, "later"),
        caption(2, "middle"),
      ],
    );
    track.sanitize();

    assert_eq!(
      track.captions,
      vec![caption(0, "first"), caption(2, "middle"), caption(4, "later")]
    );
  }

  #[test]
  fn test_video_roundtrip() {
    let mut video = Video {
      id: "abc123".to_string(),
      title: "A title".to_string(),
      description: "A description".to_string(),
      keywords: vec!["one".to_string(), "two".to_string()],
      uploaded: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
      caption_tracks: vec![CaptionTrack::new("English", "url", vec![caption(1, "hi there")])],
    };
    video.sanitize();

    let json = serde_json::to_string(&video).unwrap();
    let mut back: Video = serde_json::from_str(&json).unwrap();
    back.sanitize();

    assert_eq!(video, back);
  }

  #[test]
  fn test_failed_tracks_are_not_indexable() {
    let video = Video {
      id: "abc123".to_string(),
      title: String::new(),
      description: String::new(),
      keywords: Vec::new(),
      uploaded: Utc::now(),
      caption_tracks: vec![
        CaptionTrack::new("English", "url", vec![caption(0, "ok")]),
        CaptionTrack::failed(
          "German",
          "url2",
          TrackError {
            message: "download failed".to_string(),
            details: None,
          },
        ),
      ],
    };

    let indexable: Vec<_> = video.indexable_tracks().map(|t| t.language_name.as_str()).collect();
    assert_eq!(indexable, vec!["English"]);
  }
}
