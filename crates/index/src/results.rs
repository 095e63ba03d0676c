//! Lifting raw hit locations into user-facing search results.

use tubescan_core::{Caption, CaptionTrack, PaddedMatch, Video, merge, normalize_whitespace, video::CAPTION_SEPARATOR};

use crate::fields::{Fields, caption_field_name};
use crate::highlight::QueryProfile;

/// Matches of one caption track: the padded excerpt over the track full text
/// and the synthetic caption spanning the involved captions, ascending by
/// `caption.at`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionMatch {
  pub excerpt: PaddedMatch,
  pub caption: Caption,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackMatches {
  /// User-facing field name: `<language_name>_Captions`.
  pub field_name: String,
  pub language_name: String,
  pub matches: Vec<CaptionMatch>,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
  pub video: Video,
  pub score: f32,
  pub title_matches: Option<PaddedMatch>,
  pub description_matches: Vec<PaddedMatch>,
  pub keyword_matches: Vec<PaddedMatch>,
  pub caption_track_matches: Vec<TrackMatches>,
}

impl SearchResult {
  pub fn has_matches(&self) -> bool {
    self.title_matches.is_some()
      || !self.description_matches.is_empty()
      || !self.keyword_matches.is_empty()
      || !self.caption_track_matches.is_empty()
  }
}

/// Build the result for one hit video from the query profile.
pub fn build_result(video: Video, score: f32, profile: &QueryProfile, fields: &Fields, padding: usize) -> SearchResult {
  let title_hits = profile.hits(fields.title, &video.title);
  let title_matches = (!title_hits.is_empty()).then(|| PaddedMatch::whole(&video.title, title_hits));

  let description_matches = pad_and_merge(profile.hits(fields.description, &video.description), padding, &video.description);

  let keyword_matches = keyword_matches(&video.keywords, profile, fields);

  let caption_track_matches = video
    .indexable_tracks()
    .filter_map(|track| {
      let full = track.full_text();
      let merged = pad_and_merge(profile.hits(fields.captions, &full.text), padding, &full.text);
      let matches = remap_to_captions(track, merged);
      (!matches.is_empty()).then(|| TrackMatches {
        field_name: caption_field_name(&track.language_name),
        language_name: track.language_name.clone(),
        matches,
      })
    })
    .collect();

  SearchResult {
    video,
    score,
    title_matches,
    description_matches,
    keyword_matches,
    caption_track_matches,
  }
}

fn pad_and_merge(hits: Vec<(usize, usize)>, padding: usize, text: &str) -> Vec<PaddedMatch> {
  let padded = hits
    .into_iter()
    .map(|(start, len)| PaddedMatch::pad(start, len, padding, text))
    .collect();
  merge(padded, text)
}

/// Keywords are indexed as one logical field: the keyword strings
/// concatenated without a separator. Hit locations against that concatenation
/// are regrouped per originating keyword by scanning the per-keyword start
/// offsets, and each keyword with hits yields one unpadded match over the
/// keyword text with the hits rebased to the keyword start.
fn keyword_matches(keywords: &[String], profile: &QueryProfile, fields: &Fields) -> Vec<PaddedMatch> {
  if keywords.is_empty() {
    return Vec::new();
  }

  // Start offset of each keyword in the concatenation.
  let mut starts = Vec::with_capacity(keywords.len());
  let mut offset = 0;
  for keyword in keywords {
    starts.push(offset);
    offset += keyword.len();
  }

  let hits = concatenated_keyword_hits(keywords, &starts, profile, fields);

  let mut out = Vec::new();
  for (i, keyword) in keywords.iter().enumerate() {
    let base = starts[i];
    let rebased: Vec<(usize, usize)> = hits
      .iter()
      .filter(|(start, _)| *start >= base && *start < base + keyword.len())
      .map(|(start, len)| (start - base, *len))
      .collect();
    if !rebased.is_empty() {
      out.push(PaddedMatch::whole(keyword, rebased));
    }
  }
  out
}

/// Hit locations against the separator-less keyword concatenation. Tokens
/// never span keywords (they are indexed as separate values), so locations
/// are produced per keyword and shifted by its start offset.
fn concatenated_keyword_hits(
  keywords: &[String],
  starts: &[usize],
  profile: &QueryProfile,
  fields: &Fields,
) -> Vec<(usize, usize)> {
  let mut hits = Vec::new();
  for (keyword, base) in keywords.iter().zip(starts) {
    for (start, len) in profile.hits(fields.keywords, keyword) {
      hits.push((base + start, len));
    }
  }
  hits
}

/// Map merged padded intervals over the track full text back to captions:
/// the synthetic caption starts at the first caption whose offset is at or
/// before the padded start and spans through the last caption whose offset is
/// at or before the padded end. Output ascending by `caption.at`.
fn remap_to_captions(track: &CaptionTrack, merged: Vec<PaddedMatch>) -> Vec<CaptionMatch> {
  let full = track.full_text();
  if full.starts.is_empty() {
    return Vec::new();
  }

  let mut matches: Vec<CaptionMatch> = merged
    .into_iter()
    .map(|excerpt| {
      let first = full.starts.partition_point(|(offset, _)| *offset <= excerpt.start).saturating_sub(1);
      let last = full.starts.partition_point(|(offset, _)| *offset <= excerpt.end).saturating_sub(1);

      let texts: Vec<String> = full.starts[first..=last]
        .iter()
        .map(|&(_, caption_index)| normalize_whitespace(&track.captions[caption_index].text))
        .collect();

      let caption = Caption {
        at: track.captions[full.starts[first].1].at,
        text: texts.join(CAPTION_SEPARATOR),
      };
      CaptionMatch { excerpt, caption }
    })
    .collect();

  matches.sort_by_key(|m| m.caption.at);
  matches
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use tantivy::Index;
  use tantivy::query::QueryParser;
  use tubescan_core::IncludedMatch;

  use super::*;
  use crate::fields::build_schema;

  fn profile_for(raw: &str) -> (QueryProfile, Fields) {
    let (schema, fields) = build_schema();
    let index = Index::create_in_ram(schema);
    let parser = QueryParser::for_index(
      &index,
      vec![fields.title, fields.description, fields.keywords, fields.captions],
    );
    let query = parser.parse_query(raw).expect("query should parse");
    let analyzer = index.tokenizer_for_field(fields.title).expect("default analyzer");
    (QueryProfile::new(&*query, raw, &fields, analyzer), fields)
  }

  fn video_with(title: &str, description: &str, keywords: &[&str], tracks: Vec<CaptionTrack>) -> Video {
    Video {
      id: "vid1".to_string(),
      title: title.to_string(),
      description: description.to_string(),
      keywords: keywords.iter().map(|k| k.to_string()).collect(),
      uploaded: Utc::now(),
      caption_tracks: tracks,
    }
  }

  fn track(language: &str, captions: &[(u32, &str)]) -> CaptionTrack {
    CaptionTrack::new(
      language,
      "http://example.test/track",
      captions
        .iter()
        .map(|&(at, text)| Caption {
          at,
          text: text.to_string(),
        })
        .collect(),
    )
  }

  #[test]
  fn test_title_match_is_whole_and_unpadded() {
    let (profile, fields) = profile_for("helper");
    let video = video_with("A helper function", "", &[], Vec::new());
    let result = build_result(video, 1.0, &profile, &fields, 5);

    let title = result.title_matches.expect("title should match");
    assert_eq!(title.start, 0);
    assert_eq!(title.value, "A helper function");
    assert_eq!(title.included, vec![IncludedMatch { start: 2, length: 6 }]);
    assert!(result.description_matches.is_empty());
  }

  #[test]
  fn test_description_padding_scenario() {
    let text = "A helper comparable to Match including one or multiple PaddedMatch.Included matches";
    let (profile, fields) = profile_for("\"comparable to Match\"");
    let video = video_with("", text, &[], Vec::new());
    let result = build_result(video, 1.0, &profile, &fields, 5);

    assert_eq!(result.description_matches.len(), 1);
    let m = &result.description_matches[0];
    assert_eq!(m.value, "lper comparable to Match incl");
    assert_eq!(m.start, text.find("comparable").unwrap() - 5);
  }

  #[test]
  fn test_keyword_hits_grouped_per_keyword() {
    let (profile, fields) = profile_for("rust");
    let video = video_with("", "", &["learn rust", "rust tutorial", "cooking"], Vec::new());
    let result = build_result(video, 1.0, &profile, &fields, 0);

    assert_eq!(result.keyword_matches.len(), 2);
    assert_eq!(result.keyword_matches[0].value, "learn rust");
    assert_eq!(
      result.keyword_matches[0].included,
      vec![IncludedMatch { start: 6, length: 4 }]
    );
    assert_eq!(result.keyword_matches[1].value, "rust tutorial");
    assert_eq!(
      result.keyword_matches[1].included,
      vec![IncludedMatch { start: 0, length: 4 }]
    );
  }

  #[test]
  fn test_caption_phrase_spans_adjacent_captions() {
    let (profile, fields) = profile_for("\"world this\"");
    let video = video_with(
      "",
      "",
      &[],
      vec![track("English", &[(0, "hello world"), (2, "this is"), (4, "a test")])],
    );
    let result = build_result(video, 1.0, &profile, &fields, 0);

    assert_eq!(result.caption_track_matches.len(), 1);
    let track_matches = &result.caption_track_matches[0];
    assert_eq!(track_matches.field_name, "English_Captions");
    assert_eq!(track_matches.matches.len(), 1);

    let m = &track_matches.matches[0];
    assert_eq!(m.caption.at, 0);
    assert_eq!(m.caption.text, "hello world this is");
    assert_eq!(m.excerpt.value, "world this");
  }

  #[test]
  fn test_caption_matches_sorted_by_time() {
    let (profile, fields) = profile_for("needle");
    let video = video_with(
      "",
      "",
      &[],
      vec![track(
        "English",
        &[(0, "the needle early"), (10, "plain middle"), (20, "needle late")],
      )],
    );
    let result = build_result(video, 1.0, &profile, &fields, 0);

    let matches = &result.caption_track_matches[0].matches;
    assert_eq!(matches.len(), 2);
    assert!(matches[0].caption.at < matches[1].caption.at);
    assert_eq!(matches[0].caption.at, 0);
    assert_eq!(matches[1].caption.at, 20);
  }

  #[test]
  fn test_failed_track_produces_no_matches() {
    let (profile, fields) = profile_for("anything");
    let failed = CaptionTrack::failed(
      "German",
      "url",
      tubescan_core::TrackError {
        message: "unavailable".to_string(),
        details: None,
      },
    );
    let video = video_with("", "", &[], vec![failed]);
    let result = build_result(video, 1.0, &profile, &fields, 0);

    assert!(result.caption_track_matches.is_empty());
    assert!(!result.has_matches());
  }

  #[test]
  fn test_padded_caption_extends_to_neighbor_captions() {
    let (profile, fields) = profile_for("middle");
    let video = video_with(
      "",
      "",
      &[],
      vec![track("English", &[(0, "first part"), (2, "the middle bit"), (4, "last part")])],
    );
    // Full text: "first part the middle bit last part"
    //             0          11             26
    let result = build_result(video, 1.0, &profile, &fields, 8);

    let matches = &result.caption_track_matches[0].matches;
    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    // Padding reaches into the first and last captions, so the synthetic
    // caption spans all three.
    assert_eq!(m.caption.at, 0);
    assert_eq!(m.caption.text, "first part the middle bit last part");
  }
}
