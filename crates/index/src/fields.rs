//! Index schema and field-name conventions.

use tantivy::schema::{Field, STORED, STRING, Schema, TEXT};

/// Suffix identifying caption-track hits in user-facing field names; the
/// prefix is the track's language name.
pub const CAPTIONS_FIELD_SUFFIX: &str = "_Captions";

pub const TITLE_FIELD: &str = "title";
pub const DESCRIPTION_FIELD: &str = "description";
pub const KEYWORDS_FIELD: &str = "keywords";
pub const CAPTIONS_FIELD: &str = "captions";

/// Handles for the indexed fields of a video document.
///
/// `keywords` and `captions` are multi-valued: one value per keyword and one
/// per caption track. The tokenizer's position gap between values keeps
/// phrases from matching across keywords or across tracks.
#[derive(Debug, Clone, Copy)]
pub struct Fields {
  pub id: Field,
  pub title: Field,
  pub description: Field,
  pub keywords: Field,
  pub captions: Field,
}

impl Fields {
  /// Resolve a user-facing field name (as used in query restrictions) to the
  /// schema field it is indexed under.
  pub fn by_name(&self, name: &str) -> Option<Field> {
    match name {
      TITLE_FIELD => Some(self.title),
      DESCRIPTION_FIELD => Some(self.description),
      KEYWORDS_FIELD => Some(self.keywords),
      CAPTIONS_FIELD => Some(self.captions),
      _ => None,
    }
  }
}

pub fn build_schema() -> (Schema, Fields) {
  let mut builder = Schema::builder();
  let fields = Fields {
    id: builder.add_text_field("id", STRING | STORED),
    title: builder.add_text_field(TITLE_FIELD, TEXT),
    description: builder.add_text_field(DESCRIPTION_FIELD, TEXT),
    keywords: builder.add_text_field(KEYWORDS_FIELD, TEXT),
    captions: builder.add_text_field(CAPTIONS_FIELD, TEXT),
  };
  (builder.build(), fields)
}

/// The user-facing field name of a caption track.
pub fn caption_field_name(language_name: &str) -> String {
  format!("{language_name}{CAPTIONS_FIELD_SUFFIX}")
}

/// The language name behind a caption-track field name, if it is one.
pub fn language_from_field(field_name: &str) -> Option<&str> {
  field_name.strip_suffix(CAPTIONS_FIELD_SUFFIX)
}
