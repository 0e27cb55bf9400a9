//! Analysis data model

use crate::retrieval::SourceReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hazard reported by the vision step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardFinding {
    /// 1-based position in the vision output, most severe first
    pub hazard_id: u32,
    pub description: String,
}

/// Structured violation for one hazard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyViolation {
    pub hazard_id: u32,
    pub hazard_description: String,
    pub hazard_category: String,
    pub hazard_level: String,
    pub recommendations: String,
    pub rule_reference: String,
    /// Empty exactly when no grounded citation was established
    pub source_documents: Vec<SourceReference>,
}

impl SafetyViolation {
    pub fn is_grounded(&self) -> bool {
        !self.source_documents.is_empty()
    }
}

/// Violations for one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub violations: Vec<SafetyViolation>,
}

impl SafetyReport {
    pub fn new(violations: Vec<SafetyViolation>) -> Self {
        let generated_at = Utc::now();
        Self {
            report_id: format!("SR-{}", generated_at.format("%Y%m%d%H%M%S%3f")),
            generated_at,
            violations,
        }
    }
}

/// Schema the vision model fills in
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HazardList {
    pub hazards: Vec<String>,
}

impl HazardList {
    /// Number findings from 1, dropping blank entries and keeping at most `max`
    pub fn into_findings(self, max: usize) -> Vec<HazardFinding> {
        self.hazards
            .into_iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .take(max)
            .enumerate()
            .map(|(i, description)| HazardFinding {
                hazard_id: i as u32 + 1,
                description,
            })
            .collect()
    }
}
