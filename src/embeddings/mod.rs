// Embeddings module
// Markdown chunking and the text-to-vector seam used by ingestion and search

pub mod chunking;

pub use chunking::{Chunk, chapter_name_from_path, chunk_id, chunk_markdown};

use crate::Result;

/// Vector length produced by `text-embedding-3-small`
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Turns text into a fixed-length embedding vector
pub trait Embedder: Send + Sync {
    /// Embed a single text. Every vector returned has length [`Embedder::dimension`].
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize;
}
