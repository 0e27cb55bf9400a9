//! Semantic document indexes
//!
//! A [`DocumentIndex`] wraps one named collection of embedded chunks and
//! answers similarity queries with scored copies of those chunks.

mod qdrant;

pub use qdrant::QdrantIndex;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Similarity search over one collection
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Return up to `k` chunks ordered by descending similarity.
    ///
    /// A missing collection is reported as
    /// [`SafetyVisionError::CollectionNotFound`](crate::SafetyVisionError::CollectionNotFound),
    /// never as an empty result.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        score_threshold: Option<f64>,
    ) -> Result<Vec<Chunk>>;

    /// Collection name
    fn name(&self) -> &str;
}

/// A unit of indexed text, annotated with the score of the retrieval that returned it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Similarity or rerank relevance, depending on the last stage that scored it
    pub score: f64,
}

impl Chunk {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata, score: f64) -> Self {
        Self {
            content: content.into(),
            metadata,
            score,
        }
    }

    /// Copy of this chunk carrying a different score
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

/// Metadata written by the ingestion processors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub filename: Option<String>,

    /// 0-based page index (PDF)
    #[serde(default, deserialize_with = "deserialize_page")]
    pub page: Option<u32>,

    /// Worksheet name (Excel)
    #[serde(default)]
    pub sheet_name: Option<String>,

    /// Row range such as "2-11" (Excel)
    #[serde(default)]
    pub row_range: Option<String>,

    /// Section heading (Markdown)
    #[serde(default)]
    pub section: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ChunkMetadata {
    pub fn for_file(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::default()
        }
    }
}

// Loaders disagree on whether the page is a number or a string
fn deserialize_page<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}
