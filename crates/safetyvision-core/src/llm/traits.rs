//! LLM trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Cross-encoder reranking trait
///
/// Implementations are best-effort: callers treat any error as "reranking
/// unavailable" and keep their similarity ranking.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score `documents` against `query`, returning at most `top_n` results
    /// ordered by descending relevance
    async fn rerank(&self, query: &str, documents: &[String], top_n: usize)
        -> Result<Vec<RerankResult>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Reranking result
#[derive(Debug, Clone, PartialEq)]
pub struct RerankResult {
    /// Position of the document in the submitted batch
    pub index: usize,
    /// Relevance score; `None` means the service did not score this document
    pub relevance_score: Option<f64>,
}
