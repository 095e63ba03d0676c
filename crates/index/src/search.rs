//! Search execution over a per-scope index.
//!
//! A search evaluates the query under a read lock, materializes hit videos
//! through the caller's [`VideoSource`], constructs owned results, applies the
//! requested ordering, and runs the one-shot drift recovery when the source
//! reports videos the index has forgotten about.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::TantivyDocument;
use tracing::{debug, info};
use tubescan_core::{Error, Result};

use crate::highlight::QueryProfile;
use crate::results::{SearchResult, build_result};
use crate::source::{SourcedVideo, VideoSource};
use crate::video_index::{VideoIndex, index_error};

/// How many videos are materialized concurrently during result construction.
const SOURCE_CONCURRENCY: usize = 4;

pub const DEFAULT_MAX_HITS: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
  Score,
  Uploaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOrder {
  pub key: SortKey,
  pub descending: bool,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
  pub query: String,
  /// When set, hits outside this set are dropped.
  pub relevant_ids: Option<HashSet<String>>,
  /// Context characters around description and caption matches.
  pub padding: usize,
  /// Explicit ordering for playlist scopes; `None` emits in production order.
  pub order_by: Option<SearchOrder>,
  pub max_hits: usize,
}

impl SearchRequest {
  pub fn new(query: impl Into<String>) -> Self {
    Self {
      query: query.into(),
      relevant_ids: None,
      padding: 0,
      order_by: None,
      max_hits: DEFAULT_MAX_HITS,
    }
  }

  pub fn restricted_to(mut self, ids: impl IntoIterator<Item = String>) -> Self {
    self.relevant_ids = Some(ids.into_iter().collect());
    self
  }

  pub fn padded(mut self, padding: usize) -> Self {
    self.padding = padding;
    self
  }

  pub fn ordered_by(mut self, order: SearchOrder) -> Self {
    self.order_by = Some(order);
    self
  }
}

impl VideoIndex {
  /// Evaluate `request` and return owned results.
  ///
  /// Terminates after at most two index passes: the normal pass, and one
  /// recovery pass over videos the source reported stale or gone.
  pub async fn search(&self, request: &SearchRequest, source: &dyn VideoSource) -> Result<Vec<SearchResult>> {
    let mut restrict = request.relevant_ids.clone();
    let mut results = Vec::new();

    for pass in 0..2 {
      let recover = pass == 0;
      let (profile, hits) = self.evaluate(&request.query, restrict.as_ref(), request.max_hits).await?;
      if hits.is_empty() {
        break;
      }

      let loaded: Vec<(String, f32, Option<SourcedVideo>)> = futures::stream::iter(hits)
        .map(|(id, score)| async move {
          let sourced = source.video(&id).await?;
          Ok::<_, Error>((id, score, sourced))
        })
        .buffered(SOURCE_CONCURRENCY)
        .try_collect()
        .await?;

      let mut constructed = Vec::new();
      let mut drift = Vec::new();
      let mut gone = Vec::new();
      let mut uploaded: Vec<(String, DateTime<Utc>)> = Vec::new();

      for (id, score, sourced) in loaded {
        match sourced {
          None => {
            if recover {
              gone.push(id);
            }
          }
          Some(sourced) => {
            uploaded.push((sourced.video.id.clone(), sourced.video.uploaded));
            if sourced.stale && recover {
              drift.push(sourced.video);
            } else {
              constructed.push(build_result(sourced.video, score, &profile, &self.fields, request.padding));
            }
          }
        }
      }

      source.record_uploaded(&uploaded).await?;

      if let Some(order) = request.order_by {
        sort_results(&mut constructed, order);
      }
      results.extend(constructed);

      if !recover || (drift.is_empty() && gone.is_empty()) {
        break;
      }

      info!(stale = drift.len(), gone = gone.len(), "re-indexing drifted videos");
      self.begin_batch().await?;
      for id in &gone {
        self.remove(id).await?;
      }
      for video in &drift {
        self.replace(video).await?;
      }
      self.commit_batch().await?;
      self.save().await?;

      if drift.is_empty() {
        break;
      }
      restrict = Some(drift.into_iter().map(|v| v.id).collect());
    }

    Ok(results)
  }

  /// Parse and evaluate the query under the read lock; returns the query
  /// profile for hit extraction and the restricted `(id, score)` hits in
  /// production order.
  async fn evaluate(
    &self,
    raw_query: &str,
    restrict: Option<&HashSet<String>>,
    max_hits: usize,
  ) -> Result<(QueryProfile, Vec<(String, f32)>)> {
    let _guard = self.writer.read().await;

    let parser = QueryParser::for_index(
      self.index(),
      vec![
        self.fields.title,
        self.fields.description,
        self.fields.keywords,
        self.fields.captions,
      ],
    );
    let query = parser
      .parse_query(raw_query)
      .map_err(|e| Error::QueryParse(e.to_string()))?;

    let searcher = self.searcher();
    let top = searcher
      .search(&query, &TopDocs::with_limit(max_hits.max(1)))
      .map_err(index_error)?;

    let mut hits = Vec::with_capacity(top.len());
    for (score, address) in top {
      let doc: TantivyDocument = searcher.doc(address).map_err(index_error)?;
      let Some(id) = doc.get_first(self.fields.id).and_then(|v| v.as_str()) else {
        continue;
      };
      if restrict.is_none_or(|ids| ids.contains(id)) {
        hits.push((id.to_string(), score));
      }
    }
    debug!(query = raw_query, hits = hits.len(), "index pass");

    let analyzer = self.index().tokenizer_for_field(self.fields.title).map_err(index_error)?;
    let profile = QueryProfile::new(&*query, raw_query, &self.fields, analyzer);
    Ok((profile, hits))
  }
}

/// Check a query against the schema without touching any index. Lets callers
/// reject malformed queries before any fetch or index work happens.
pub fn validate_query(raw_query: &str) -> Result<()> {
  let (schema, fields) = crate::fields::build_schema();
  let parser = QueryParser::new(
    schema,
    vec![fields.title, fields.description, fields.keywords, fields.captions],
    tantivy::tokenizer::TokenizerManager::default(),
  );
  parser
    .parse_query(raw_query)
    .map(|_| ())
    .map_err(|e| Error::QueryParse(e.to_string()))
}

/// Stable sort by the requested key; ties keep discovery order. The key
/// comparison is reversed for descending order rather than the slice, so tie
/// order is direction-independent.
fn sort_results(results: &mut [SearchResult], order: SearchOrder) {
  results.sort_by(|a, b| {
    let ordering = match order.key {
      SortKey::Score => a.score.total_cmp(&b.score),
      SortKey::Uploaded => a.video.uploaded.cmp(&b.video.uploaded),
    };
    if order.descending { ordering.reverse() } else { ordering }
  });
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result_with(score: f32, uploaded_day: u32) -> SearchResult {
    use chrono::TimeZone;
    let video = tubescan_core::Video {
      id: format!("v{score}-{uploaded_day}"),
      title: String::new(),
      description: String::new(),
      keywords: Vec::new(),
      uploaded: Utc.with_ymd_and_hms(2024, 1, uploaded_day, 0, 0, 0).unwrap(),
      caption_tracks: Vec::new(),
    };
    SearchResult {
      video,
      score,
      title_matches: None,
      description_matches: Vec::new(),
      keyword_matches: Vec::new(),
      caption_track_matches: Vec::new(),
    }
  }

  #[test]
  fn test_sort_by_uploaded_descending() {
    let mut results = vec![result_with(1.0, 2), result_with(2.0, 5), result_with(3.0, 1)];
    sort_results(
      &mut results,
      SearchOrder {
        key: SortKey::Uploaded,
        descending: true,
      },
    );
    let days: Vec<u32> = results.iter().map(|r| r.video.uploaded.format("%d").to_string().parse().unwrap()).collect();
    assert_eq!(days, vec![5, 2, 1]);
  }

  #[test]
  fn test_sort_ties_keep_discovery_order() {
    let mut results = vec![result_with(1.0, 3), result_with(2.0, 3), result_with(3.0, 3)];
    sort_results(
      &mut results,
      SearchOrder {
        key: SortKey::Uploaded,
        descending: true,
      },
    );
    let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![1.0, 2.0, 3.0]);
  }

  #[test]
  fn test_validate_query() {
    assert!(validate_query("plain words").is_ok());
    assert!(validate_query("title:\"a phrase\" AND other").is_ok());

    let err = validate_query("(unclosed").unwrap_err();
    match err {
      Error::QueryParse(message) => assert!(!message.is_empty()),
      other => panic!("expected QueryParse, got {other:?}"),
    }
  }

  #[test]
  fn test_sort_by_score_ascending() {
    let mut results = vec![result_with(3.0, 1), result_with(1.0, 2), result_with(2.0, 3)];
    sort_results(
      &mut results,
      SearchOrder {
        key: SortKey::Score,
        descending: false,
      },
    );
    let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![1.0, 2.0, 3.0]);
  }
}
