//! Tiered retrieval: similarity → rerank → threshold filter → fallback
//!
//! The coarse stage is plain similarity search, not MMR.

use crate::config::Settings;
use crate::error::Result;
use crate::index::{Chunk, DocumentIndex};
use crate::llm::{RerankResult, Reranker};
use std::sync::Arc;

/// Retrieval over one index with an optional reranker
pub struct RetrievalEngine {
    index: Arc<dyn DocumentIndex>,
    reranker: Option<Arc<dyn Reranker>>,
    settings: Arc<Settings>,
}

impl RetrievalEngine {
    pub fn new(
        index: Arc<dyn DocumentIndex>,
        reranker: Option<Arc<dyn Reranker>>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            index,
            reranker,
            settings,
        }
    }

    /// Name of the underlying collection
    pub fn index_name(&self) -> &str {
        self.index.name()
    }

    /// Plain similarity search; errors are returned to the caller
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        score_threshold: Option<f64>,
    ) -> Result<Vec<Chunk>> {
        self.index.similarity_search(query, k, score_threshold).await
    }

    /// Best available ranking for `query`. Never fails: every upstream fault
    /// degrades to a less precise ranking, ultimately to an empty list.
    pub async fn retrieve_with_fallback(
        &self,
        query: &str,
        k: usize,
        score_threshold: Option<f64>,
    ) -> Vec<Chunk> {
        if k == 0 {
            return Vec::new();
        }

        let Some(reranker) = &self.reranker else {
            return self.similarity_with_retry(query, k, score_threshold).await;
        };

        let fetch_k = k.saturating_mul(self.settings.fetch_k_multiplier);
        let mut candidates = self
            .similarity_with_retry(query, fetch_k, score_threshold)
            .await;
        if candidates.len() <= k {
            return candidates;
        }

        let documents: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let top_n = k.saturating_mul(self.settings.rerank_top_n_multiplier);

        match reranker.rerank(query, &documents, top_n).await {
            Ok(ranked) => {
                let candidate_count = candidates.len();
                let kept = apply_rerank(
                    candidates,
                    ranked,
                    k,
                    self.settings.rerank_score_threshold,
                );
                tracing::debug!(
                    index = self.index.name(),
                    candidates = candidate_count,
                    kept = kept.len(),
                    "reranked candidates"
                );
                kept
            }
            Err(e) => {
                tracing::warn!(
                    index = self.index.name(),
                    reranker = reranker.model_name(),
                    error = %e,
                    "rerank failed, keeping similarity ranking"
                );
                candidates.truncate(k);
                candidates
            }
        }
    }

    async fn similarity_with_retry(
        &self,
        query: &str,
        k: usize,
        score_threshold: Option<f64>,
    ) -> Vec<Chunk> {
        match self.index.similarity_search(query, k, score_threshold).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(
                    index = self.index.name(),
                    ?score_threshold,
                    error = %e,
                    "similarity search failed, retrying without threshold"
                );
                match self.index.similarity_search(query, k, None).await {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        tracing::warn!(
                            index = self.index.name(),
                            error = %e,
                            "similarity search failed again, returning no documents"
                        );
                        Vec::new()
                    }
                }
            }
        }
    }
}

/// Reorder `candidates` by rerank relevance, drop those below `threshold`,
/// and keep at most `k`. Kept chunks carry their rerank score; unscored
/// results pass through with their similarity score.
fn apply_rerank(
    candidates: Vec<Chunk>,
    ranked: Vec<RerankResult>,
    k: usize,
    threshold: f64,
) -> Vec<Chunk> {
    let mut slots: Vec<Option<Chunk>> = candidates.into_iter().map(Some).collect();
    let mut kept = Vec::with_capacity(k);

    for result in ranked {
        if kept.len() >= k {
            break;
        }
        if matches!(result.relevance_score, Some(score) if score < threshold) {
            continue;
        }
        // Out-of-range or repeated indexes are ignored
        let Some(chunk) = slots.get_mut(result.index).and_then(Option::take) else {
            continue;
        };
        kept.push(match result.relevance_score {
            Some(score) => chunk.with_score(score),
            None => chunk,
        });
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scored, StubIndex, StubReranker};

    fn settings() -> Arc<Settings> {
        Arc::new(Settings {
            fetch_k_multiplier: 5,
            rerank_top_n_multiplier: 2,
            rerank_score_threshold: 0.3,
            ..Settings::default()
        })
    }

    fn engine(index: Arc<StubIndex>, reranker: Option<Arc<StubReranker>>) -> RetrievalEngine {
        RetrievalEngine::new(
            index,
            reranker.map(|r| r as Arc<dyn Reranker>),
            settings(),
        )
    }

    fn fifteen() -> Vec<Chunk> {
        let scores: Vec<f64> = (0..15).map(|i| 0.9 - i as f64 * 0.04).collect();
        scored(&scores)
    }

    #[tokio::test]
    async fn test_without_reranker_uses_threshold() {
        let index = Arc::new(StubIndex::new("regs", scored(&[0.8, 0.6, 0.4])));
        let results = engine(index.clone(), None)
            .retrieve_with_fallback("missing hard hat", 5, Some(0.5))
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(index.calls(), 1);
        assert_eq!(index.requested_k(), vec![5]);
    }

    #[tokio::test]
    async fn test_threshold_error_retries_without_threshold() {
        let index = Arc::new(StubIndex::new("regs", scored(&[0.8, 0.2])).failing_with_threshold());
        let results = engine(index.clone(), None)
            .retrieve_with_fallback("q", 5, Some(0.5))
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(index.calls(), 2);
    }

    #[tokio::test]
    async fn test_total_index_failure_returns_empty() {
        let index = Arc::new(StubIndex::new("regs", scored(&[0.8])).failing());
        let results = engine(index.clone(), None)
            .retrieve_with_fallback("q", 5, Some(0.5))
            .await;

        assert!(results.is_empty());
        assert_eq!(index.calls(), 2);
    }

    #[tokio::test]
    async fn test_rerank_timeout_keeps_similarity_top_k() {
        let index = Arc::new(StubIndex::new("regs", fifteen()));
        let reranker = Arc::new(StubReranker::timing_out());
        let results = engine(index.clone(), Some(reranker.clone()))
            .retrieve_with_fallback("q", 3, None)
            .await;

        assert_eq!(reranker.calls(), 1);
        assert_eq!(reranker.batch_sizes(), vec![(15, 6)]);
        assert_eq!(index.requested_k(), vec![15]);
        let scores: Vec<f64> = results.iter().map(|c| c.score).collect();
        let expected: Vec<f64> = fifteen().iter().take(3).map(|c| c.score).collect();
        assert_eq!(scores, expected);
    }

    #[tokio::test]
    async fn test_rerank_reorders_filters_and_rescores() {
        let index = Arc::new(StubIndex::new("regs", fifteen()));
        let reranker = Arc::new(StubReranker::ranking(vec![
            (7, Some(0.95)),
            (2, Some(0.81)),
            (0, Some(0.10)),
            (4, Some(0.55)),
            (9, Some(0.40)),
        ]));
        let results = engine(index, Some(reranker))
            .retrieve_with_fallback("q", 3, None)
            .await;

        let contents: Vec<&str> = results.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["content 7", "content 2", "content 4"]);
        let scores: Vec<f64> = results.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.95, 0.81, 0.55]);
    }

    #[tokio::test]
    async fn test_unscored_rerank_results_pass_through() {
        let index = Arc::new(StubIndex::new("regs", fifteen()));
        let reranker = Arc::new(StubReranker::ranking(vec![(5, None), (1, Some(0.2))]));
        let results = engine(index, Some(reranker))
            .retrieve_with_fallback("q", 3, None)
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "content 5");
        assert_eq!(results[0].score, fifteen()[5].score);
    }

    #[tokio::test]
    async fn test_few_candidates_skip_reranker() {
        let index = Arc::new(StubIndex::new("regs", scored(&[0.9, 0.7])));
        let reranker = Arc::new(StubReranker::ranking(vec![(1, Some(0.99))]));
        let results = engine(index, Some(reranker.clone()))
            .retrieve_with_fallback("q", 3, None)
            .await;

        assert_eq!(reranker.calls(), 0);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score, 0.9);
    }

    #[tokio::test]
    async fn test_coarse_stage_applies_similarity_threshold() {
        let index = Arc::new(StubIndex::new("regs", fifteen()));
        let reranker = Arc::new(StubReranker::timing_out());
        let results = engine(index, Some(reranker.clone()))
            .retrieve_with_fallback("q", 2, Some(0.8))
            .await;

        // Only 0.90, 0.86, 0.82 clear the threshold; three > k so rerank is tried
        assert_eq!(reranker.batch_sizes(), vec![(3, 4)]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_apply_rerank_ignores_duplicates_and_bad_indexes() {
        let ranked = vec![
            RerankResult { index: 1, relevance_score: Some(0.9) },
            RerankResult { index: 1, relevance_score: Some(0.8) },
            RerankResult { index: 42, relevance_score: Some(0.7) },
            RerankResult { index: 0, relevance_score: Some(0.6) },
        ];
        let kept = apply_rerank(scored(&[0.5, 0.4]), ranked, 5, 0.3);
        let scores: Vec<f64> = kept.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.9, 0.6]);
    }

    #[tokio::test]
    async fn test_plain_retrieve_propagates_errors() {
        let index = Arc::new(StubIndex::new("regs", scored(&[0.9])).failing());
        let result = engine(index.clone(), None).retrieve("q", 5, None).await;
        assert!(matches!(result, Err(crate::SafetyVisionError::CollectionNotFound(_))));
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_k_returns_nothing() {
        let index = Arc::new(StubIndex::new("regs", scored(&[0.9])));
        let results = engine(index.clone(), None).retrieve_with_fallback("q", 0, None).await;
        assert!(results.is_empty());
        assert_eq!(index.calls(), 0);
    }
}
