
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{Distance, PointRecord, ScoredPoint, VectorStore};
use crate::client::{ClientError, JsonClient};
use crate::config::QdrantConfig;
use crate::{RagError, Result};

/// Vector store backed by a Qdrant server's REST API
#[derive(Debug, Clone)]
pub struct QdrantClient {
    http: JsonClient,
}

/// Every Qdrant response wraps its payload in `result`
#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionsList {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateCollectionRequest {
    vectors: VectorParams,
}

#[derive(Debug, Serialize)]
struct VectorParams {
    size: usize,
    distance: Distance,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    points: &'a [PointRecord],
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    status: ErrorStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorStatus {
    error: String,
}

impl QdrantClient {
    #[inline]
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        let mut http = JsonClient::new(&config.url, Duration::from_secs(config.timeout_seconds))
            .map_err(|e| RagError::Config(format!("Invalid vector store URL: {}", e)))?;

        if let Some(key) = config.api_key.as_deref().filter(|key| !key.trim().is_empty()) {
            http = http.with_header("api-key", key.to_string());
        }

        debug!("Qdrant client targeting {}", http.base_url());
        Ok(Self { http })
    }
}

impl VectorStore for QdrantClient {
    #[inline]
    fn list_collections(&self) -> Result<Vec<String>> {
        let response: QdrantResponse<CollectionsList> =
            self.http.get("collections").map_err(store_error)?;

        Ok(response
            .result
            .collections
            .into_iter()
            .map(|collection| collection.name)
            .collect())
    }

    #[inline]
    fn create_collection(&self, name: &str, dimension: usize, distance: Distance) -> Result<()> {
        let request = CreateCollectionRequest {
            vectors: VectorParams {
                size: dimension,
                distance,
            },
        };

        let _: QdrantResponse<IgnoredAny> = self
            .http
            .put(&format!("collections/{}", name), &request)
            .map_err(store_error)?;
        Ok(())
    }

    #[inline]
    fn upsert(&self, collection: &str, points: &[PointRecord]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        debug!("Upserting {} points into {}", points.len(), collection);

        let _: QdrantResponse<IgnoredAny> = self
            .http
            .put(
                &format!("collections/{}/points?wait=true", collection),
                &UpsertRequest { points },
            )
            .map_err(store_error)?;
        Ok(())
    }

    #[inline]
    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        with_payload: bool,
    ) -> Result<Vec<ScoredPoint>> {
        let request = SearchRequest {
            vector,
            limit,
            with_payload,
        };

        let response: QdrantResponse<Vec<ScoredPoint>> = self
            .http
            .post(&format!("collections/{}/points/search", collection), &request)
            .map_err(store_error)?;

        debug!(
            "Search in {} returned {} points",
            collection,
            response.result.len()
        );
        Ok(response.result)
    }

    #[inline]
    fn delete_collection(&self, name: &str) -> Result<()> {
        let _: QdrantResponse<IgnoredAny> = self
            .http
            .delete(&format!("collections/{}", name))
            .map_err(store_error)?;
        Ok(())
    }
}

fn store_error(error: ClientError) -> RagError {
    let message = match &error {
        ClientError::Status { status, body } => serde_json::from_str::<ErrorBody>(body)
            .map_or_else(
                |_| error.to_string(),
                |parsed| format!("HTTP {}: {}", status, parsed.status.error),
            ),
        _ => error.to_string(),
    };
    RagError::VectorStore(message)
}
