//! LLM integration
//!
//! Provides traits and implementations for:
//! - Chat, vision and schema-constrained generation via external services
//! - Embedding generation
//! - Cross-encoder reranking

mod client;
mod http_embedder;
mod http_reranker;
mod traits;

pub use client::{
    extract_json, generate_structured, ChatMessage, ContentPart, ImageUrl, JsonSchema, LLMClient,
    MessageContent, VLLMClient,
};
pub use http_embedder::HttpEmbedder;
pub use http_reranker::HttpReranker;
pub use traits::*;
