pub mod client;
pub mod retry;

pub use client::{PlaylistSource, RemoteVideo, TrackInfo, YouTubeClient};
pub use retry::{RetryConfig, RetryingClient};
