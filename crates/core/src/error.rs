use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  /// The query string was rejected by the index library's parser.
  /// Carries the library's message verbatim; user-visible.
  #[error("invalid query: {0}")]
  QueryParse(String),

  /// The caller supplied an invalid id, alias, URL or out-of-range parameter.
  #[error("invalid input: {0}")]
  Input(String),

  /// Transient network failure. Retried with backoff inside the client layer;
  /// surfaces only after retries are exhausted.
  #[error("network: {0}")]
  Network(String),

  /// The remote video/playlist/channel does not exist or is private.
  #[error("{entity} {id} not found or inaccessible")]
  RemoteNotFound { entity: &'static str, id: String },

  #[error("cancelled")]
  Cancelled,

  #[error("cache: {0}")]
  Cache(String),

  #[error("index: {0}")]
  Index(String),

  #[error("IO: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON: {0}")]
  Json(#[from] serde_json::Error),

  /// Unexpected failure; logged with context and surfaced.
  #[error("{0}")]
  Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
  /// Whether retrying the operation may succeed.
  pub fn is_transient(&self) -> bool {
    matches!(self, Error::Network(_))
  }
}
