//! Qdrant collection over its REST API

use super::{Chunk, ChunkMetadata, DocumentIndex};
use crate::config::IndexConfig;
use crate::error::{Result, SafetyVisionError};
use crate::llm::Embedder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// One Qdrant collection, queried with embeddings from `embedder`
///
/// Payloads follow the LangChain layout: `{page_content, metadata}`.
pub struct QdrantIndex {
    http_client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    score_threshold: Option<f64>,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f64,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    page_content: Option<String>,
    #[serde(default)]
    metadata: ChunkMetadata,
}

impl QdrantIndex {
    pub fn new(
        config: &IndexConfig,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: collection.into(),
            embedder,
        })
    }
}

#[async_trait]
impl DocumentIndex for QdrantIndex {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        score_threshold: Option<f64>,
    ) -> Result<Vec<Chunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let request = SearchRequest {
            vector: &vector,
            limit: k,
            with_payload: true,
            score_threshold,
        };

        let url = format!("{}/collections/{}/points/search", self.url, self.collection);
        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.api_key {
            req = req.header("api-key", api_key);
        }

        let response = req.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SafetyVisionError::CollectionNotFound(self.collection.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SafetyVisionError::Index(format!(
                "qdrant search on '{}' failed (HTTP {}): {}",
                self.collection, status, body
            )));
        }

        let body = response.text().await?;
        let chunks = parse_search_response(&body)?;
        tracing::debug!(
            collection = %self.collection,
            k,
            ?score_threshold,
            returned = chunks.len(),
            "similarity search"
        );
        Ok(chunks)
    }

    fn name(&self) -> &str {
        &self.collection
    }
}

fn parse_search_response(body: &str) -> Result<Vec<Chunk>> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| SafetyVisionError::Index(format!("malformed search response: {}", e)))?;

    Ok(parsed
        .result
        .into_iter()
        .filter_map(|point| {
            let payload = point.payload?;
            let content = payload.page_content?;
            Some(Chunk::new(content, payload.metadata, point.score))
        })
        .collect())
}
