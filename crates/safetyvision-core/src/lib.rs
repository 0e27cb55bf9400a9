//! SafetyVision Core Library
//!
//! Retrieval-and-grounding pipeline for construction-site safety analysis.
//!
//! # Features
//! - Hazard extraction from site photographs via a vision model
//! - Tiered retrieval: similarity search, cross-encoder rerank, threshold fallback
//! - Regulations-first arbitration with a supplemental hazard database
//! - Score-gated citation of regulatory passages in generated violations

pub mod analysis;
pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod retrieval;

#[cfg(test)]
mod test_support;

pub use analysis::{
    validate_image, ConfidenceBand, GroundingOutcome, HazardFinding, SafetyAnalyzer,
    SafetyAnalyzerBuilder, SafetyReport, SafetyViolation, ViolationGenerator,
};
pub use config::{Config, IndexConfig, LLMServiceConfig, RerankServiceConfig, Settings};
pub use error::{Error, Result, SafetyVisionError};
pub use index::{Chunk, ChunkMetadata, DocumentIndex, QdrantIndex};
pub use llm::{
    ChatMessage, Embedder, HttpEmbedder, HttpReranker, JsonSchema, LLMClient, RerankResult,
    Reranker, VLLMClient,
};
pub use retrieval::{
    describe_location, ContextFormatter, FormattedContext, MultiCollectionRetriever,
    RetrievalEngine, SourceReference,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "safetyvision";
