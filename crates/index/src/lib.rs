pub mod fields;
pub mod highlight;
pub mod results;
pub mod search;
pub mod source;
pub mod video_index;

pub use fields::{CAPTIONS_FIELD_SUFFIX, Fields, caption_field_name, language_from_field};
pub use highlight::QueryProfile;
pub use results::{CaptionMatch, SearchResult, TrackMatches};
pub use search::{DEFAULT_MAX_HITS, SearchOrder, SearchRequest, SortKey, validate_query};
pub use source::{SourcedVideo, VideoSource};
pub use video_index::VideoIndex;
