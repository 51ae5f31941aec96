
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::{ClientError, JsonClient};
use crate::config::OpenAiConfig;
use crate::embeddings::Embedder;
use crate::llm::{ChatMessage, ChatModel, CompletionOptions};
use crate::{RagError, Result};

/// Client for an OpenAI-compatible API, used both for embeddings and chat completions
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: JsonClient,
    embedding_model: String,
    chat_model: String,
    embedding_dimension: usize,
    has_api_key: bool,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let mut http = JsonClient::new(
            &config.base_url,
            Duration::from_secs(config.timeout_seconds),
        )
        .map_err(|e| RagError::Config(format!("Invalid model API URL: {}", e)))?;

        let has_api_key = config.has_api_key();
        if let Some(key) = config.api_key.as_deref().filter(|_| has_api_key) {
            http = http.with_header("Authorization", format!("Bearer {}", key));
        } else {
            warn!("No model API key configured, requests will be unauthenticated");
        }

        Ok(Self {
            http,
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            embedding_dimension: config.embedding_dimension,
            has_api_key,
        })
    }

    #[inline]
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

impl Embedder for OpenAiClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response: EmbeddingResponse = self
            .http
            .post("embeddings", &request)
            .map_err(|e| RagError::Embedding(describe(&e)))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| RagError::Embedding("Response contained no embeddings".to_string()))?;

        if embedding.len() != self.embedding_dimension {
            return Err(RagError::Embedding(format!(
                "Expected {} dimensions, got {}",
                self.embedding_dimension,
                embedding.len()
            )));
        }

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.embedding_dimension
    }
}

impl ChatModel for OpenAiClient {
    #[inline]
    fn complete(&self, messages: &[ChatMessage], options: &CompletionOptions) -> Result<String> {
        debug!(
            "Requesting completion from {} with {} messages",
            self.chat_model,
            messages.len()
        );

        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response: ChatCompletionResponse = self
            .http
            .post("chat/completions", &request)
            .map_err(|e| RagError::Llm(describe(&e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::Llm("Response contained no answer".to_string()))
    }

    #[inline]
    fn is_configured(&self) -> bool {
        self.has_api_key
    }
}

/// Prefer the API's own error message over the raw response body
fn describe(error: &ClientError) -> String {
    match error {
        ClientError::Status { status, body } => serde_json::from_str::<ErrorEnvelope>(body)
            .map_or_else(
                |_| error.to_string(),
                |envelope| format!("HTTP {}: {}", status, envelope.error.message),
            ),
        _ => error.to_string(),
    }
}
