//! Context-padded match excerpts.
//!
//! Raw hit locations from the index are lifted into readable excerpts: each
//! hit is widened by a configurable number of characters on both sides, and
//! overlapping or touching excerpts are merged while keeping the original hit
//! positions as included sub-intervals.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A hit location inside a padded excerpt, relative to the excerpt start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludedMatch {
  pub start: usize,
  pub length: usize,
}

/// An inclusive interval `[start, end]` over some source text, the substring
/// in that interval, and the hit locations inside it.
///
/// Invariants: the interval is non-empty and within the source text; every
/// included sub-interval lies within `value`; no two padded matches in one
/// output list overlap or touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaddedMatch {
  pub start: usize,
  pub end: usize,
  pub value: String,
  pub included: Vec<IncludedMatch>,
}

impl PaddedMatch {
  /// Pad a single hit `[hit_start, hit_start + hit_length)` by `padding`
  /// bytes on both sides, clamped to the text bounds and to UTF-8 character
  /// boundaries.
  pub fn pad(hit_start: usize, hit_length: usize, padding: usize, text: &str) -> Self {
    debug_assert!(hit_length > 0);
    debug_assert!(hit_start + hit_length <= text.len());

    let start = floor_boundary(text, hit_start.saturating_sub(padding));
    let end_excl = ceil_boundary(text, (hit_start + hit_length - 1 + padding + 1).min(text.len()));

    Self {
      start,
      end: end_excl - 1,
      value: text[start..end_excl].to_string(),
      included: vec![IncludedMatch {
        start: hit_start - start,
        length: hit_length,
      }],
    }
  }

  /// Whole-text match carrying every hit as an included sub-interval.
  /// Used for fields that are never padded (titles, single keywords).
  pub fn whole(text: &str, hits: impl IntoIterator<Item = (usize, usize)>) -> Self {
    Self {
      start: 0,
      end: text.len().saturating_sub(1),
      value: text.to_string(),
      included: hits
        .into_iter()
        .map(|(start, length)| IncludedMatch { start, length })
        .collect(),
    }
  }

  fn touches_or_overlaps(&self, other: &Self) -> bool {
    // Inputs are ordered by start, so only the right edge matters.
    self.end + 1 >= other.start
  }
}

/// Equality (and hashing) over the `(start, end, value)` triple.
impl PartialEq for PaddedMatch {
  fn eq(&self, other: &Self) -> bool {
    self.start == other.start && self.end == other.end && self.value == other.value
  }
}

impl Eq for PaddedMatch {}

impl Hash for PaddedMatch {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.start.hash(state);
    self.end.hash(state);
    self.value.hash(state);
  }
}

/// Merge overlapping or touching padded matches into connected components.
///
/// Each component yields one match spanning `[min start, max end]` with the
/// union of included sub-intervals rebased to the new start. Ascending order
/// is preserved; the operation is idempotent.
pub fn merge(mut matches: Vec<PaddedMatch>, text: &str) -> Vec<PaddedMatch> {
  if matches.len() < 2 {
    return matches;
  }
  matches.sort_by_key(|m| m.start);

  let mut merged: Vec<PaddedMatch> = Vec::with_capacity(matches.len());

  for m in matches {
    match merged.last_mut() {
      Some(last) if last.touches_or_overlaps(&m) => {
        let new_end = last.end.max(m.end);
        for inc in &m.included {
          let absolute = m.start + inc.start;
          last.included.push(IncludedMatch {
            start: absolute - last.start,
            length: inc.length,
          });
        }
        last.included.sort_by_key(|i| (i.start, i.length));
        last.included.dedup();
        last.end = new_end;
        last.value = text[last.start..=new_end].to_string();
      }
      _ => merged.push(m),
    }
  }

  merged
}

fn floor_boundary(text: &str, mut i: usize) -> usize {
  while i > 0 && !text.is_char_boundary(i) {
    i -= 1;
  }
  i
}

fn ceil_boundary(text: &str, mut i: usize) -> usize {
  while i < text.len() && !text.is_char_boundary(i) {
    i += 1;
  }
  i
}
