// In-memory stand-ins for the external services, shared by unit tests

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::database::{Distance, PointRecord, ScoredPoint, VectorStore};
use crate::embeddings::Embedder;
use crate::llm::{ChatMessage, ChatModel, CompletionOptions};
use crate::{RagError, Result};

/// Deterministic embedder: the vector encodes text length, so equal texts embed equally
pub(crate) struct FakeEmbedder {
    pub dimension: usize,
    /// Texts containing this marker fail to embed
    pub fail_on: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(dimension: usize, marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Self::new(dimension)
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("embedder lock").clone()
    }
}

impl Embedder for FakeEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.lock().expect("embedder lock").push(text.to_string());

        if self.fail_on.as_deref().is_some_and(|marker| text.contains(marker)) {
            return Err(RagError::Embedding("HTTP 500: upstream failure".to_string()));
        }

        let mut vector = vec![0.0; self.dimension];
        if let Some(first) = vector.first_mut() {
            *first = text.chars().count() as f32;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoredCollection {
    pub dimension: usize,
    pub distance: Distance,
    pub points: BTreeMap<String, PointRecord>,
}

/// Vector store that keeps collections in memory and returns canned search results
#[derive(Default)]
pub(crate) struct FakeStore {
    pub collections: Mutex<BTreeMap<String, StoredCollection>>,
    pub search_results: Vec<ScoredPoint>,
    pub unavailable: bool,
    /// Number of upserts, counted from the first, that fail
    pub failing_upserts: Mutex<usize>,
    pub upsert_batches: Mutex<Vec<usize>>,
    pub searches: Mutex<Vec<(String, usize, bool)>>,
}

impl FakeStore {
    pub fn with_results(results: Vec<ScoredPoint>) -> Self {
        Self {
            search_results: results,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_collection(name: &str, dimension: usize) -> Self {
        let store = Self::default();
        store.collections.lock().expect("store lock").insert(
            name.to_string(),
            StoredCollection {
                dimension,
                distance: Distance::Cosine,
                points: BTreeMap::new(),
            },
        );
        store
    }

    pub fn failing_first_upserts(count: usize) -> Self {
        Self {
            failing_upserts: Mutex::new(count),
            ..Self::default()
        }
    }

    pub fn collection(&self, name: &str) -> Option<StoredCollection> {
        self.collections.lock().expect("store lock").get(name).cloned()
    }

    pub fn upsert_batches(&self) -> Vec<usize> {
        self.upsert_batches.lock().expect("store lock").clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(RagError::VectorStore("Connection refused".to_string()));
        }
        Ok(())
    }
}

impl VectorStore for FakeStore {
    fn list_collections(&self) -> Result<Vec<String>> {
        self.check_available()?;
        Ok(self.collections.lock().expect("store lock").keys().cloned().collect())
    }

    fn create_collection(&self, name: &str, dimension: usize, distance: Distance) -> Result<()> {
        self.check_available()?;
        self.collections.lock().expect("store lock").insert(
            name.to_string(),
            StoredCollection {
                dimension,
                distance,
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn upsert(&self, collection: &str, points: &[PointRecord]) -> Result<()> {
        self.check_available()?;

        let mut failing = self.failing_upserts.lock().expect("store lock");
        if *failing > 0 {
            *failing -= 1;
            return Err(RagError::VectorStore("HTTP 500: upsert rejected".to_string()));
        }
        drop(failing);

        let mut collections = self.collections.lock().expect("store lock");
        let stored = collections.get_mut(collection).ok_or_else(|| {
            RagError::VectorStore(format!("Collection `{}` doesn't exist", collection))
        })?;

        for point in points {
            stored.points.insert(point.id.clone(), point.clone());
        }
        self.upsert_batches.lock().expect("store lock").push(points.len());
        Ok(())
    }

    fn search(
        &self,
        collection: &str,
        _vector: &[f32],
        limit: usize,
        with_payload: bool,
    ) -> Result<Vec<ScoredPoint>> {
        self.check_available()?;
        self.searches.lock().expect("store lock").push((
            collection.to_string(),
            limit,
            with_payload,
        ));
        Ok(self.search_results.iter().take(limit).cloned().collect())
    }

    fn delete_collection(&self, name: &str) -> Result<()> {
        self.check_available()?;
        match self.collections.lock().expect("store lock").remove(name) {
            Some(_) => Ok(()),
            None => Err(RagError::VectorStore(format!(
                "Collection `{}` doesn't exist",
                name
            ))),
        }
    }
}

/// Chat model that records every request and replies with a fixed answer
pub(crate) struct FakeChat {
    pub reply: Result<String>,
    pub configured: bool,
    pub requests: Mutex<Vec<(Vec<ChatMessage>, CompletionOptions)>>,
}

impl FakeChat {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            configured: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(RagError::Llm(message.to_string())),
            ..Self::replying("")
        }
    }

    pub fn last_request(&self) -> Option<(Vec<ChatMessage>, CompletionOptions)> {
        self.requests.lock().expect("chat lock").last().cloned()
    }
}

impl ChatModel for FakeChat {
    fn complete(&self, messages: &[ChatMessage], options: &CompletionOptions) -> Result<String> {
        self.requests
            .lock()
            .expect("chat lock")
            .push((messages.to_vec(), *options));

        match &self.reply {
            Ok(answer) => Ok(answer.clone()),
            Err(RagError::Llm(message)) => Err(RagError::Llm(message.clone())),
            Err(other) => Err(RagError::Llm(other.to_string())),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// A search hit whose payload holds the given string fields
pub(crate) fn scored(score: f32, fields: &[(&str, &str)]) -> ScoredPoint {
    ScoredPoint {
        id: Value::from(format!("point-{}", score)),
        score,
        payload: Some(
            fields
                .iter()
                .map(|(key, value)| ((*key).to_string(), Value::from(*value)))
                .collect(),
        ),
    }
}
