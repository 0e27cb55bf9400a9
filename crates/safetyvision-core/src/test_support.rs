//! In-process stand-ins for the external capabilities, used by unit tests

use crate::error::{Result, SafetyVisionError};
use crate::index::{Chunk, ChunkMetadata, DocumentIndex};
use crate::llm::{ChatMessage, JsonSchema, LLMClient, RerankResult, Reranker};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn chunk(filename: &str, content: &str, score: f64) -> Chunk {
    Chunk::new(content, ChunkMetadata::for_file(filename), score)
}

pub fn scored(scores: &[f64]) -> Vec<Chunk> {
    scores
        .iter()
        .enumerate()
        .map(|(i, s)| chunk(&format!("doc{}.pdf", i), &format!("content {}", i), *s))
        .collect()
}

/// Index returning a fixed ranking, honouring `k` and the threshold
pub struct StubIndex {
    name: String,
    chunks: Vec<Chunk>,
    calls: AtomicUsize,
    requested_k: Mutex<Vec<usize>>,
    fail_with_threshold: bool,
    fail_always: bool,
}

impl StubIndex {
    pub fn new(name: &str, chunks: Vec<Chunk>) -> Self {
        Self {
            name: name.to_string(),
            chunks,
            calls: AtomicUsize::new(0),
            requested_k: Mutex::new(Vec::new()),
            fail_with_threshold: false,
            fail_always: false,
        }
    }

    pub fn failing_with_threshold(mut self) -> Self {
        self.fail_with_threshold = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_always = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_k(&self) -> Vec<usize> {
        self.requested_k.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentIndex for StubIndex {
    async fn similarity_search(
        &self,
        _query: &str,
        k: usize,
        score_threshold: Option<f64>,
    ) -> Result<Vec<Chunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested_k.lock().unwrap().push(k);
        if self.fail_always {
            return Err(SafetyVisionError::CollectionNotFound(self.name.clone()));
        }
        if self.fail_with_threshold && score_threshold.is_some() {
            return Err(SafetyVisionError::Index("threshold search unsupported".into()));
        }
        Ok(self
            .chunks
            .iter()
            .filter(|c| score_threshold.map_or(true, |t| c.score >= t))
            .take(k)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Reranker that either fails or replays a fixed ranking
pub struct StubReranker {
    ranking: Option<Vec<(usize, Option<f64>)>>,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<(usize, usize)>>,
}

impl StubReranker {
    pub fn ranking(ranking: Vec<(usize, Option<f64>)>) -> Self {
        Self {
            ranking: Some(ranking),
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn timing_out() -> Self {
        Self {
            ranking: None,
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(documents, top_n)` per call
    pub fn batch_sizes(&self) -> Vec<(usize, usize)> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reranker for StubReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push((documents.len(), top_n));
        match &self.ranking {
            Some(ranking) => Ok(ranking
                .iter()
                .take(top_n)
                .map(|(index, relevance_score)| RerankResult {
                    index: *index,
                    relevance_score: *relevance_score,
                })
                .collect()),
            None => Err(SafetyVisionError::Rerank("operation timed out".into())),
        }
    }

    fn model_name(&self) -> &str {
        "stub-reranker"
    }
}

type Responder = Box<dyn Fn(&[ChatMessage]) -> Result<serde_json::Value> + Send + Sync>;

/// Generation capability answering structured calls through a closure
pub struct StubLLM {
    respond: Responder,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubLLM {
    pub fn with<F>(respond: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Result<serde_json::Value> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(value: serde_json::Value) -> Self {
        Self::with(move |_| Ok(value.clone()))
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::with(move |_| Err(SafetyVisionError::Llm(message.clone())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Text of every message sent, one entry per call
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMClient for StubLLM {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let value = self.chat_completion_structured(messages, &JsonSchema::new("text", serde_json::json!({}))).await?;
        Ok(value.to_string())
    }

    async fn chat_completion_structured(
        &self,
        messages: Vec<ChatMessage>,
        _schema: &JsonSchema,
    ) -> Result<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text: Vec<String> = messages.iter().map(ChatMessage::text).collect();
        self.prompts.lock().unwrap().push(text.join("\n"));
        (self.respond)(&messages)
    }

    fn model_name(&self) -> &str {
        "stub-llm"
    }
}
