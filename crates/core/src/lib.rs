pub mod config;
pub mod error;
pub mod excerpt;
pub mod playlist;
pub mod scope;
pub mod video;

pub use config::{Config, DEFAULT_CACHE_HOURS, DEFAULT_PADDING, DEFAULT_TOP};
pub use error::{Error, Result};
pub use excerpt::{IncludedMatch, PaddedMatch, merge};
pub use playlist::{PlaylistEntry, PlaylistSnapshot};
pub use scope::{Scope, ScopeKey, ScopeKind, parse_channel_alias, parse_playlist_id, parse_video_id};
pub use video::{CAPTION_SEPARATOR, Caption, CaptionTrack, TrackError, TrackText, Video, normalize_whitespace};
