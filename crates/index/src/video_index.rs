//! The per-scope video index: storage operations and batch writes.
//!
//! One `VideoIndex` owns one tantivy index directory. Writes go through an
//! explicit batch (`begin_batch` / `commit_batch`) so one durable commit
//! follows many in-memory mutations; `save` makes committed segments visible
//! to subsequent searches. A reader/writer lock keeps the single writer
//! exclusive while allowing concurrent searches.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tantivy::collector::Count;
use tantivy::directory::MmapDirectory;
use tantivy::query::TermQuery;
use tantivy::schema::{IndexRecordOption, Schema};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use tubescan_core::{Error, Result, Video};

use crate::fields::{Fields, build_schema};

const WRITER_HEAP_BYTES: usize = 50_000_000;

pub(crate) fn index_error(e: impl std::fmt::Display) -> Error {
  Error::Index(e.to_string())
}

pub struct VideoIndex {
  path: PathBuf,
  index: Index,
  reader: IndexReader,
  pub(crate) fields: Fields,
  /// Guards the single writer against concurrent readers. `None` until the
  /// first batch; the writer is reused across batches (it holds the index
  /// write lock on disk for the lifetime of this instance).
  pub(crate) writer: RwLock<Option<IndexWriter>>,
}

impl VideoIndex {
  /// Open the index directory at `path`, or create an empty one. An existing
  /// directory that cannot be opened (corruption, schema drift) is deleted
  /// and replaced by a fresh empty index; affected videos re-index on demand.
  pub async fn open_or_create(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    let (schema, fields) = build_schema();

    let index = match open_index(&path, schema.clone()) {
      Ok(index) => index,
      Err(e) => {
        warn!(path = %path.display(), error = %e, "unreadable index, rebuilding empty");
        tokio::fs::remove_dir_all(&path).await.ok();
        open_index(&path, schema)?
      }
    };

    let reader = index
      .reader_builder()
      .reload_policy(ReloadPolicy::Manual)
      .try_into()
      .map_err(index_error)?;

    debug!(path = %path.display(), "index open");
    Ok(Self {
      path,
      index,
      reader,
      fields,
      writer: RwLock::new(None),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn fields(&self) -> &Fields {
    &self.fields
  }

  pub(crate) fn index(&self) -> &Index {
    &self.index
  }

  pub(crate) fn searcher(&self) -> tantivy::Searcher {
    self.reader.searcher()
  }

  pub async fn is_empty(&self) -> bool {
    let _guard = self.writer.read().await;
    self.reader.searcher().num_docs() == 0
  }

  /// Which of the candidate ids have a document in the index.
  pub async fn indexed_ids(&self, candidates: &[String]) -> Result<HashSet<String>> {
    let _guard = self.writer.read().await;
    let searcher = self.reader.searcher();

    let mut present = HashSet::new();
    for id in candidates {
      let query = TermQuery::new(Term::from_field_text(self.fields.id, id), IndexRecordOption::Basic);
      let count = searcher.search(&query, &Count).map_err(index_error)?;
      if count > 0 {
        present.insert(id.clone());
      }
    }
    Ok(present)
  }

  /// Open a batch. Mutations require an open batch; committing keeps the
  /// batch open for reuse.
  pub async fn begin_batch(&self) -> Result<()> {
    let mut slot = self.writer.write().await;
    if slot.is_none() {
      *slot = Some(self.index.writer(WRITER_HEAP_BYTES).map_err(index_error)?);
    }
    Ok(())
  }

  /// Insert the video's object fields and one value per caption track.
  pub async fn add(&self, video: &Video) -> Result<()> {
    let slot = self.writer.write().await;
    let writer = require_batch(&slot)?;
    writer.add_document(self.document_for(video)).map_err(index_error)?;
    Ok(())
  }

  /// Remove-by-key followed by add, inside the current batch.
  pub async fn replace(&self, video: &Video) -> Result<()> {
    let slot = self.writer.write().await;
    let writer = require_batch(&slot)?;
    writer.delete_term(Term::from_field_text(self.fields.id, &video.id));
    writer.add_document(self.document_for(video)).map_err(index_error)?;
    Ok(())
  }

  pub async fn remove(&self, id: &str) -> Result<()> {
    let slot = self.writer.write().await;
    let writer = require_batch(&slot)?;
    writer.delete_term(Term::from_field_text(self.fields.id, id));
    Ok(())
  }

  /// Atomically persist all mutations since the last commit.
  pub async fn commit_batch(&self) -> Result<()> {
    let mut slot = self.writer.write().await;
    if let Some(writer) = slot.as_mut() {
      writer.commit().map_err(index_error)?;
    }
    Ok(())
  }

  /// Persist outstanding mutations and make committed segments searchable.
  pub async fn save(&self) -> Result<()> {
    let mut slot = self.writer.write().await;
    if let Some(writer) = slot.as_mut() {
      writer.commit().map_err(index_error)?;
    }
    drop(slot);
    self.reader.reload().map_err(index_error)
  }

  fn document_for(&self, video: &Video) -> TantivyDocument {
    let mut doc = TantivyDocument::new();
    doc.add_text(self.fields.id, &video.id);
    doc.add_text(self.fields.title, &video.title);
    doc.add_text(self.fields.description, &video.description);
    for keyword in &video.keywords {
      doc.add_text(self.fields.keywords, keyword);
    }
    for track in video.indexable_tracks() {
      doc.add_text(self.fields.captions, &track.full_text().text);
    }
    doc
  }
}

fn require_batch<'a>(slot: &'a Option<IndexWriter>) -> Result<&'a IndexWriter> {
  slot
    .as_ref()
    .ok_or_else(|| Error::Index("mutation outside an open batch".to_string()))
}

fn open_index(path: &Path, schema: Schema) -> Result<Index> {
  std::fs::create_dir_all(path)?;
  let dir = MmapDirectory::open(path).map_err(index_error)?;
  Index::open_or_create(dir, schema).map_err(index_error)
}
