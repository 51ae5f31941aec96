// Vector database module
// Collection management, point upserts and similarity search

pub mod qdrant;

pub use qdrant::QdrantClient;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::Result;

/// Similarity metric of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
}

/// Outcome of [`VectorStore::ensure_collection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    Created,
    AlreadyExists,
}

/// A record to upsert: id, embedding and arbitrary JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

/// A search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    #[serde(default)]
    pub id: Value,
    pub score: f32,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

impl ScoredPoint {
    /// String payload field, if present
    #[inline]
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|payload| payload.get(key))
            .and_then(Value::as_str)
    }
}

/// Operations the application needs from a vector database
pub trait VectorStore: Send + Sync {
    fn list_collections(&self) -> Result<Vec<String>>;

    fn create_collection(&self, name: &str, dimension: usize, distance: Distance) -> Result<()>;

    /// Create the collection unless one with this name already exists
    fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<CollectionStatus> {
        if self.list_collections()?.iter().any(|existing| existing == name) {
            info!("Collection already exists: {}", name);
            return Ok(CollectionStatus::AlreadyExists);
        }

        self.create_collection(name, dimension, distance)?;
        info!(
            "Created collection: {} ({} dimensions, {:?})",
            name, dimension, distance
        );
        Ok(CollectionStatus::Created)
    }

    /// Insert or overwrite points by id
    fn upsert(&self, collection: &str, points: &[PointRecord]) -> Result<()>;

    /// Top `limit` points by similarity, highest score first
    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        with_payload: bool,
    ) -> Result<Vec<ScoredPoint>>;

    fn delete_collection(&self, name: &str) -> Result<()>;
}
