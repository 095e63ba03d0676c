//! Hit location extraction.
//!
//! The index library scores and selects documents; exact hit offsets are
//! recovered by re-tokenizing the video's stored texts with the index
//! analyzer and matching against the parsed query: field-scoped single terms
//! match per token, quoted phrases match as whole token sequences and yield
//! one location per occurrence.

use std::collections::{HashMap, HashSet};

use tantivy::query::Query;
use tantivy::schema::Field;
use tantivy::tokenizer::{TextAnalyzer, TokenStream};

use crate::fields::Fields;

#[derive(Debug, Clone)]
struct Phrase {
  /// Restricting field, when the phrase was written as `field:"..."`.
  field: Option<Field>,
  tokens: Vec<String>,
}

#[derive(Debug, Clone)]
struct OwnedToken {
  text: String,
  offset_from: usize,
  offset_to: usize,
}

/// What to look for when locating hits in a field's text, derived once per
/// parsed query.
pub struct QueryProfile {
  analyzer: TextAnalyzer,
  singles: HashMap<Field, HashSet<String>>,
  phrases: Vec<Phrase>,
}

impl QueryProfile {
  pub fn new(query: &dyn Query, raw_query: &str, fields: &Fields, analyzer: TextAnalyzer) -> Self {
    let mut singles: HashMap<Field, HashSet<String>> = HashMap::new();
    query.query_terms(&mut |term, positions_needed| {
      // Position-carrying terms belong to phrases; those are matched as
      // sequences below, not as single tokens.
      if !positions_needed
        && let Some(text) = term.value().as_str()
      {
        singles.entry(term.field()).or_default().insert(text.to_string());
      }
    });

    let phrases = quoted_segments(raw_query)
      .into_iter()
      .filter_map(|(field_name, text)| {
        let tokens: Vec<String> = tokenize(&analyzer, &text).into_iter().map(|t| t.text).collect();
        if tokens.is_empty() {
          return None;
        }
        Some(Phrase {
          field: field_name.and_then(|name| fields.by_name(&name)),
          tokens,
        })
      })
      .collect();

    Self {
      analyzer,
      singles,
      phrases,
    }
  }

  /// Whether the query can produce hits at all (an all-phrase query over an
  /// empty text cannot, for instance).
  pub fn is_empty(&self) -> bool {
    self.singles.values().all(|s| s.is_empty()) && self.phrases.is_empty()
  }

  /// Locate hits of this query in `text`, interpreted as the given field.
  /// Returns ascending, deduplicated `(byte start, byte length)` locations.
  pub fn hits(&self, field: Field, text: &str) -> Vec<(usize, usize)> {
    if text.is_empty() {
      return Vec::new();
    }

    let tokens = tokenize(&self.analyzer, text);
    let mut covered = vec![false; tokens.len()];
    let mut locations = Vec::new();

    for phrase in &self.phrases {
      if phrase.field.is_some_and(|f| f != field) {
        continue;
      }
      let len = phrase.tokens.len();
      if tokens.len() < len {
        continue;
      }
      for i in 0..=(tokens.len() - len) {
        if (0..len).all(|j| tokens[i + j].text == phrase.tokens[j]) {
          let start = tokens[i].offset_from;
          let end = tokens[i + len - 1].offset_to;
          locations.push((start, end - start));
          covered[i..i + len].fill(true);
        }
      }
    }

    if let Some(singles) = self.singles.get(&field) {
      for (i, token) in tokens.iter().enumerate() {
        if !covered[i] && singles.contains(&token.text) {
          locations.push((token.offset_from, token.offset_to - token.offset_from));
        }
      }
    }

    locations.sort_unstable();
    locations.dedup();
    locations
  }
}

fn tokenize(analyzer: &TextAnalyzer, text: &str) -> Vec<OwnedToken> {
  let mut analyzer = analyzer.clone();
  let mut stream = analyzer.token_stream(text);
  let mut tokens = Vec::new();
  while stream.advance() {
    let token = stream.token();
    tokens.push(OwnedToken {
      text: token.text.clone(),
      offset_from: token.offset_from,
      offset_to: token.offset_to,
    });
  }
  tokens
}

/// Quoted segments of the raw query, with the `field:` prefix when present.
/// Only called on queries the parser accepted, so quotes are balanced.
fn quoted_segments(raw: &str) -> Vec<(Option<String>, String)> {
  let parts: Vec<&str> = raw.split('"').collect();
  let mut segments = Vec::new();

  for (i, part) in parts.iter().enumerate() {
    if i % 2 == 0 || part.is_empty() {
      continue;
    }
    let field = parts[i - 1].strip_suffix(':').map(|before| {
      before
        .chars()
        .rev()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .chars()
        .rev()
        .collect::<String>()
    });
    let field = field.filter(|name| !name.is_empty());
    segments.push((field, part.to_string()));
  }

  segments
}
