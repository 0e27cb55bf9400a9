//! Retrieval-and-grounding pipeline
//!
//! Provides:
//! - Tiered single-index retrieval with reranking and fallback
//! - Regulations-first arbitration across two collections
//! - Bounded context formatting with source tracking

mod context;
mod coordinator;
mod engine;

pub use context::{
    describe_location, ContextFormatter, FormattedContext, SourceReference, NO_DOCUMENTS_CONTEXT,
    NO_DOCUMENTS_SOURCES,
};
pub use coordinator::MultiCollectionRetriever;
pub use engine::RetrievalEngine;
