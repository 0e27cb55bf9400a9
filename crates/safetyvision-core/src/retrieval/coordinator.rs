//! Arbitration between the regulations index and the hazard database
//!
//! The hazard database only supplements a primary answer with too few
//! documents. Its rows are appended after the primary ones, never merged
//! by score.

use super::RetrievalEngine;
use crate::config::Settings;
use crate::index::Chunk;
use std::sync::Arc;

/// Primary/secondary retrieval for one hazard description
pub struct MultiCollectionRetriever {
    regulations: RetrievalEngine,
    hazard_db: Option<RetrievalEngine>,
    settings: Arc<Settings>,
}

impl MultiCollectionRetriever {
    pub fn new(
        regulations: RetrievalEngine,
        hazard_db: Option<RetrievalEngine>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            regulations,
            hazard_db,
            settings,
        }
    }

    pub async fn retrieve_for_hazard(&self, hazard: &str) -> Vec<Chunk> {
        let primary = self
            .regulations
            .retrieve_with_fallback(
                hazard,
                self.settings.regulations_k,
                Some(self.settings.regulations_score_threshold),
            )
            .await;

        if primary.len() >= self.settings.min_sufficient_docs {
            tracing::debug!(
                index = self.regulations.index_name(),
                found = primary.len(),
                "primary collection sufficient"
            );
            return primary;
        }

        let Some(hazard_db) = &self.hazard_db else {
            return primary;
        };

        let secondary = hazard_db
            .retrieve_with_fallback(
                hazard,
                self.settings.hazard_db_k,
                Some(self.settings.hazard_db_score_threshold),
            )
            .await;

        tracing::info!(
            primary = primary.len(),
            secondary = secondary.len(),
            index = hazard_db.index_name(),
            "supplementing from secondary collection"
        );

        let mut combined = primary;
        combined.extend(secondary);
        combined.truncate(self.settings.max_combined_docs);
        combined
    }
}
