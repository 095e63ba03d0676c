pub mod executor;
pub mod fetch;
pub mod pipeline;
pub mod refresh;
pub mod resolve;
pub mod source;

pub use executor::{SearchEngine, SearchOptions};
pub use index::{CaptionMatch, SearchOrder, SearchResult, SortKey, TrackMatches};
pub use source::EngineVideoSource;
