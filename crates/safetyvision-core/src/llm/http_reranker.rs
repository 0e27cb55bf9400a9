//! HTTP reranker for Cohere-compatible `/v1/rerank` endpoints (vLLM, TEI)

use super::{RerankResult, Reranker};
use crate::config::RerankServiceConfig;
use crate::error::{Result, SafetyVisionError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cross-encoder reranker behind an HTTP endpoint
pub struct HttpReranker {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankItem>,
}

#[derive(Deserialize)]
struct RerankItem {
    index: usize,
    #[serde(default)]
    relevance_score: Option<f64>,
}

impl HttpReranker {
    /// Create from configuration; `None` when reranking is not configured
    pub fn from_config(config: &RerankServiceConfig) -> Result<Option<Self>> {
        let Some(url) = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
        else {
            return Ok(None);
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self {
            http_client,
            url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }))
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let request = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n: top_n.min(documents.len()),
        };

        let url = format!("{}/v1/rerank", self.url.trim_end_matches('/'));
        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req
            .send()
            .await
            .map_err(|e| SafetyVisionError::Rerank(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SafetyVisionError::Rerank(format!(
                "rerank service error (HTTP {}): {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SafetyVisionError::Rerank(e.to_string()))?;
        parse_rerank_response(&body, documents.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn parse_rerank_response(body: &str, batch_len: usize) -> Result<Vec<RerankResult>> {
    let parsed: RerankResponse = serde_json::from_str(body)
        .map_err(|e| SafetyVisionError::Rerank(format!("malformed rerank response: {}", e)))?;

    let mut results = Vec::with_capacity(parsed.results.len());
    for item in parsed.results {
        if item.index >= batch_len {
            tracing::warn!(
                index = item.index,
                batch_len,
                "rerank result index out of range, dropping"
            );
            continue;
        }
        results.push(RerankResult {
            index: item.index,
            relevance_score: item.relevance_score,
        });
    }
    Ok(results)
}
