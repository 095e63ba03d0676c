mod offline;
mod output;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use cache::Storage;
use clap::{Parser, Subcommand, ValueEnum};
use engine::{SearchEngine, SearchOptions, SearchOrder, SortKey};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tubescan_core::{Config, Scope, parse_channel_alias, parse_playlist_id, parse_video_id};
use youtube::{RetryingClient, YouTubeClient};

use crate::offline::OfflineClient;

#[derive(Parser)]
#[command(name = "tubescan")]
#[command(about = "Full-text search over YouTube video metadata and captions")]
struct Cli {
  /// Config file (default: ~/.config/tubescan/config.toml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Search videos, a playlist, or a channel's uploads
  Search {
    /// Query in the index DSL: terms, "quoted phrases", AND/OR, parentheses,
    /// field:term (fields: title, description, keywords, captions)
    query: String,

    /// Video ids or watch URLs
    #[arg(long, short = 'v', num_args = 1.., conflicts_with_all = ["playlist", "channel"])]
    videos: Vec<String>,

    /// Playlist id or URL
    #[arg(long, short = 'p', conflicts_with = "channel")]
    playlist: Option<String>,

    /// Channel handle, slug, user name, or URL
    #[arg(long, short = 'c')]
    channel: Option<String>,

    /// How many videos from the head of the playlist to search
    #[arg(long)]
    top: Option<usize>,

    /// Hours before the playlist snapshot is re-enumerated
    #[arg(long)]
    cache_hours: Option<u32>,

    /// Characters of context around description and caption matches
    #[arg(long)]
    pad: Option<usize>,

    /// Result ordering for playlist scopes
    #[arg(long, value_enum)]
    order_by: Option<OrderByArg>,
  },

  /// Inspect or clear the local cache
  Cache {
    #[command(subcommand)]
    command: CacheCommands,
  },
}

#[derive(Subcommand)]
enum CacheCommands {
  /// List cached keys
  List {
    /// Key prefix, e.g. video: / playlist: / channel: / alias:
    #[arg(long)]
    prefix: Option<String>,
    /// Only keys not accessed for this many days
    #[arg(long)]
    not_accessed_for: Option<u16>,
  },
  /// Delete cached entries (and their indexes)
  Clear {
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    not_accessed_for: Option<u16>,
  },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderByArg {
  Score,
  ScoreAsc,
  Uploaded,
  UploadedAsc,
}

impl From<OrderByArg> for SearchOrder {
  fn from(arg: OrderByArg) -> Self {
    match arg {
      OrderByArg::Score => SearchOrder {
        key: SortKey::Score,
        descending: true,
      },
      OrderByArg::ScoreAsc => SearchOrder {
        key: SortKey::Score,
        descending: false,
      },
      OrderByArg::Uploaded => SearchOrder {
        key: SortKey::Uploaded,
        descending: true,
      },
      OrderByArg::UploadedAsc => SearchOrder {
        key: SortKey::Uploaded,
        descending: false,
      },
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let config = Config::load(cli.config.as_deref()).context("loading config")?;
  let storage = Storage::new(&config.cache_dir);

  match cli.command {
    Commands::Search {
      query,
      videos,
      playlist,
      channel,
      top,
      cache_hours,
      pad,
      order_by,
    } => {
      let top = top.unwrap_or(config.top);
      let cache_hours = cache_hours.unwrap_or(config.cache_hours);
      let scope = scope_from_args(videos, playlist, channel, top, cache_hours)?;
      let options = SearchOptions {
        padding: pad.unwrap_or(config.padding),
        order_by: order_by.map(Into::into),
      };
      run_search(storage, scope, query, options).await
    }
    Commands::Cache { command } => run_cache(storage, command).await,
  }
}

fn scope_from_args(
  videos: Vec<String>,
  playlist: Option<String>,
  channel: Option<String>,
  top: usize,
  cache_hours: u32,
) -> Result<Scope> {
  if !videos.is_empty() {
    let ids = videos.iter().map(|v| parse_video_id(v)).collect::<Result<Vec<_>, _>>()?;
    return Ok(Scope::Videos(ids));
  }
  if let Some(playlist) = playlist {
    return Ok(Scope::Playlist {
      id: parse_playlist_id(&playlist)?,
      top,
      cache_hours,
    });
  }
  if let Some(channel) = channel {
    return Ok(Scope::Channel {
      alias: parse_channel_alias(&channel)?,
      top,
      cache_hours,
    });
  }
  bail!("nothing to search: pass --videos, --playlist or --channel");
}

async fn run_search(storage: Storage, scope: Scope, query: String, options: SearchOptions) -> Result<()> {
  let client: Arc<dyn YouTubeClient> = Arc::new(RetryingClient::new(OfflineClient));
  let engine = SearchEngine::new(storage, client);
  let color = std::io::stdout().is_terminal();

  let cancel = CancellationToken::new();
  let ctrl_c_cancel = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      debug!("interrupt received, cancelling search");
      ctrl_c_cancel.cancel();
    }
  });

  let mut results = engine.search(scope, query, options, cancel);
  let mut matched = 0usize;
  while let Some(item) = results.recv().await {
    let result = item.context("search failed")?;
    matched += 1;
    print!("{}", output::render(&result, color));
  }

  println!("{matched} matching video{}", if matched == 1 { "" } else { "s" });
  Ok(())
}

async fn run_cache(storage: Storage, command: CacheCommands) -> Result<()> {
  match command {
    CacheCommands::List { prefix, not_accessed_for } => {
      let keys = storage.list(prefix.as_deref(), not_accessed_for).await?;
      for key in &keys {
        println!("{key}");
      }
      println!("{} cached entries", keys.len());
    }
    CacheCommands::Clear { prefix, not_accessed_for } => {
      let removed = storage.clear(prefix.as_deref(), not_accessed_for).await?;
      println!("removed {} entries", removed.len());
    }
  }
  Ok(())
}
