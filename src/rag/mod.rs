//! Retrieval-augmented answering
//!
//! Ties the embedder, the vector store and the chat model together for the
//! question answering, single-document ingestion and collection administration
//! operations served over HTTP.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::Result;
use crate::database::{CollectionStatus, Distance, PointRecord, ScoredPoint, VectorStore};
use crate::embeddings::{Embedder, chunk_id};
use crate::llm::{ChatMessage, ChatModel, CompletionOptions};

/// Number of chunks retrieved per question
pub const SEARCH_LIMIT: usize = 5;

/// Number of trailing conversation messages forwarded to the model
pub const HISTORY_LIMIT: usize = 6;

/// Length, in characters, of `context_used` before it is cut off
pub const CONTEXT_PREVIEW_CHARS: usize = 500;

pub const ANSWER_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.7,
    max_tokens: 800,
};

pub const SYSTEM_PROMPT: &str = "You are an expert AI tutor for Physical AI and Humanoid Robotics.
Your role is to answer questions based strictly on the textbook content provided.

Guidelines:
- Answer clearly and concisely
- Use examples from the textbook when relevant
- If the question cannot be answered from the provided context, say so
- For technical concepts, explain step-by-step
- If selected text is provided, focus your answer on that specific content first
";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatMessage>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub context_used: String,
}

/// Citation for one retrieved chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub chapter: String,
    pub section: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub text: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub chunk_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub qdrant: String,
    pub openai: String,
}

/// Stateless question answering over one vector collection
pub struct Assistant {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chat: Arc<dyn ChatModel>,
    collection: String,
}

impl Assistant {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chat: Arc<dyn ChatModel>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            chat,
            collection: collection.into(),
        }
    }

    /// Answer a question from retrieved textbook context
    #[inline]
    pub fn answer(&self, request: &QueryRequest) -> Result<QueryResponse> {
        info!("Answering question ({} chars)", request.question.chars().count());

        let question_embedding = self.embedder.embed(&request.question)?;
        let results = self.store.search(
            &self.collection,
            &question_embedding,
            SEARCH_LIMIT,
            true,
        )?;
        debug!("Retrieved {} chunks", results.len());

        let sources = results.iter().map(source_from).collect();
        let context = build_context(&results, request.selected_text.as_deref());
        let history = request.conversation_history.as_deref().unwrap_or_default();
        let messages = assemble_messages(&request.question, &context, history);

        let answer = self.chat.complete(&messages, &ANSWER_OPTIONS)?;

        Ok(QueryResponse {
            answer,
            sources,
            context_used: context_preview(&context),
        })
    }

    /// Embed and store a single piece of text under its content-derived id
    #[inline]
    pub fn ingest(&self, request: &IngestRequest) -> Result<IngestResponse> {
        let id = chunk_id(&request.text);
        let vector = self.embedder.embed(&request.text)?;

        let mut payload = Map::new();
        payload.insert("text".to_string(), Value::String(request.text.clone()));
        payload.extend(request.metadata.clone());

        self.store.upsert(
            &self.collection,
            &[PointRecord {
                id: id.clone(),
                vector,
                payload,
            }],
        )?;

        info!("Ingested chunk {}", id);
        Ok(IngestResponse {
            status: "success".to_string(),
            chunk_id: id,
            message: "Content ingested successfully".to_string(),
        })
    }

    #[inline]
    pub fn initialize_collection(&self) -> Result<CollectionResponse> {
        let status = self.store.ensure_collection(
            &self.collection,
            self.embedder.dimension(),
            Distance::Cosine,
        )?;

        Ok(match status {
            CollectionStatus::AlreadyExists => CollectionResponse {
                status: "exists".to_string(),
                message: format!("Collection '{}' already exists", self.collection),
            },
            CollectionStatus::Created => CollectionResponse {
                status: "created".to_string(),
                message: format!("Collection '{}' created successfully", self.collection),
            },
        })
    }

    /// Drop the whole collection, including every ingested chunk
    #[inline]
    pub fn delete_collection(&self) -> Result<CollectionResponse> {
        warn!("Deleting collection {}", self.collection);
        self.store.delete_collection(&self.collection)?;

        Ok(CollectionResponse {
            status: "deleted".to_string(),
            message: format!("Collection '{}' deleted successfully", self.collection),
        })
    }

    /// Liveness report with a live vector store check. Never fails.
    #[inline]
    pub fn health(&self) -> HealthReport {
        let qdrant = match self.store.list_collections() {
            Ok(_) => "connected".to_string(),
            Err(e) => {
                warn!("Vector store health check failed: {}", e);
                format!("error: {}", e)
            }
        };

        let openai = if self.chat.is_configured() {
            "configured"
        } else {
            "not configured"
        };

        HealthReport {
            status: "ok".to_string(),
            qdrant,
            openai: openai.to_string(),
        }
    }
}

fn source_from(result: &ScoredPoint) -> Source {
    Source {
        chapter: result.payload_str("chapter").unwrap_or("Unknown").to_string(),
        section: result.payload_str("section").unwrap_or_default().to_string(),
        score: result.score,
    }
}

/// Join retrieved chunk texts, putting user-selected text first when present
#[inline]
pub fn build_context(results: &[ScoredPoint], selected_text: Option<&str>) -> String {
    let retrieved = results
        .iter()
        .map(|result| result.payload_str("text").unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n\n");

    match selected_text.filter(|text| !text.is_empty()) {
        Some(selected) => format!(
            "SELECTED TEXT:\n{}\n\nADDITIONAL CONTEXT:\n{}",
            selected, retrieved
        ),
        None => retrieved,
    }
}

/// System prompt, the last [`HISTORY_LIMIT`] history messages, then the question
#[inline]
pub fn assemble_messages(
    question: &str,
    context: &str,
    history: &[ChatMessage],
) -> Vec<ChatMessage> {
    let recent = &history[history.len().saturating_sub(HISTORY_LIMIT)..];

    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    messages.extend_from_slice(recent);
    messages.push(ChatMessage::user(format!(
        "Context from textbook:\n{}\n\nQuestion: {}",
        context, question
    )));
    messages
}

/// First [`CONTEXT_PREVIEW_CHARS`] characters followed by `...`, only when longer
#[inline]
pub fn context_preview(context: &str) -> String {
    match context.char_indices().nth(CONTEXT_PREVIEW_CHARS) {
        Some((cut, _)) => {
            let mut preview = context.get(..cut).unwrap_or(context).to_string();
            preview.push_str("...");
            preview
        }
        None => context.to_string(),
    }
}
