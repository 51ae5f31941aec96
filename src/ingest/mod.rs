// Batch ingestion module
// Walks a directory of textbook chapters, chunks them and loads the chunks
// into the vector store


use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::database::{Distance, PointRecord, VectorStore};
use crate::embeddings::{Chunk, Embedder, chapter_name_from_path, chunk_markdown};
use crate::{RagError, Result};

/// Points buffered before each upsert
pub const UPSERT_BATCH_SIZE: usize = 10;

/// Loads every chapter of a docs directory into one collection
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
    show_progress: bool,
}

/// Counters for one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files_processed: usize,
    pub chunks_created: usize,
    pub chunks_embedded: usize,
    pub points_upserted: usize,
    pub failures: usize,
}

impl Ingestor {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while embedding
    #[inline]
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Ingest every markdown file directly inside `docs_dir`
    #[inline]
    pub fn run(&self, docs_dir: &Path) -> Result<IngestStats> {
        self.store
            .ensure_collection(&self.collection, self.embedder.dimension(), Distance::Cosine)?;

        let files = find_markdown_files(docs_dir)?;
        info!("Found {} markdown files in {}", files.len(), docs_dir.display());

        let mut stats = IngestStats::default();
        let mut chunks = Vec::new();
        for file in &files {
            let content = fs::read_to_string(file)?;
            let chapter = chapter_name_from_path(file);
            let file_chunks = chunk_markdown(&content, &chapter);
            debug!("{}: {} chunks", file.display(), file_chunks.len());

            stats.files_processed += 1;
            chunks.extend(file_chunks);
        }
        stats.chunks_created = chunks.len();
        info!("Created {} chunks", chunks.len());

        self.embed_and_store(&chunks, &mut stats);

        info!(
            "Ingestion complete: {} of {} chunks stored, {} failures",
            stats.points_upserted, stats.chunks_created, stats.failures
        );
        Ok(stats)
    }

    fn embed_and_store(&self, chunks: &[Chunk], stats: &mut IngestStats) {
        let total = chunks.len();
        let bar = self.progress_bar(total);
        let mut pending = Vec::with_capacity(UPSERT_BATCH_SIZE);

        for (index, chunk) in chunks.iter().enumerate() {
            let label = format!("{} - {}", chunk.chapter, chunk.section);
            info!("[{}/{}] {}", index + 1, total, label);
            bar.set_message(label);

            match self.embedder.embed(&chunk.text) {
                Ok(vector) => {
                    stats.chunks_embedded += 1;
                    pending.push(PointRecord {
                        id: chunk.id(),
                        vector,
                        payload: chunk.to_payload(),
                    });
                }
                Err(e) => {
                    warn!("Skipping chunk {} - {}: {}", chunk.chapter, chunk.section, e);
                    stats.failures += 1;
                }
            }
            bar.inc(1);

            if pending.len() >= UPSERT_BATCH_SIZE {
                self.flush(&mut pending, stats);
            }
        }

        self.flush(&mut pending, stats);
        bar.finish_and_clear();
    }

    fn flush(&self, pending: &mut Vec<PointRecord>, stats: &mut IngestStats) {
        if pending.is_empty() {
            return;
        }

        match self.store.upsert(&self.collection, pending) {
            Ok(()) => {
                debug!("Upserted batch of {} points", pending.len());
                stats.points_upserted += pending.len();
            }
            Err(e) => {
                error!("Failed to upsert batch of {} points: {}", pending.len(), e);
                stats.failures += pending.len();
            }
        }
        pending.clear();
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:30} [{pos}/{len}] {msg}") {
            bar.set_style(style);
        }
        bar
    }
}

/// Markdown files directly inside `dir`, sorted by file name
#[inline]
pub fn find_markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Pick the docs directory: the explicit one, else `../docs`, else `./docs`
#[inline]
pub fn resolve_docs_dir(explicit: Option<&Path>, working_dir: &Path) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        if dir.is_dir() {
            return Ok(dir.to_path_buf());
        }
        return Err(RagError::Config(format!(
            "Docs directory not found: {}",
            dir.display()
        )));
    }

    let parent_docs = working_dir.join("..").join("docs");
    if parent_docs.is_dir() {
        return Ok(parent_docs);
    }

    let local_docs = working_dir.join("docs");
    if local_docs.is_dir() {
        return Ok(local_docs);
    }

    Err(RagError::Config(format!(
        "Docs directory not found: tried {} and {}",
        parent_docs.display(),
        local_docs.display()
    )))
}
