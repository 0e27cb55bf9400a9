//! Retrieval and grounding settings
//!
//! One immutable object holds every threshold, multiplier and enumeration the
//! pipeline consults. Components receive it as `Arc<Settings>` at construction.

use crate::error::{Result, SafetyVisionError};
use serde::{Deserialize, Serialize};

/// Thresholds, multipliers and enumerations for the analysis pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Coarse candidate set size is `k * fetch_k_multiplier` when reranking
    pub fetch_k_multiplier: usize,
    /// Reranker `top_n` is `k * rerank_top_n_multiplier`
    pub rerank_top_n_multiplier: usize,
    /// Minimum rerank relevance for a candidate to survive
    pub rerank_score_threshold: f64,

    pub regulations_k: usize,
    pub regulations_score_threshold: f64,
    /// Primary results at or above this count make the secondary index unnecessary
    pub min_sufficient_docs: usize,
    pub hazard_db_k: usize,
    pub hazard_db_score_threshold: f64,
    pub max_combined_docs: usize,

    /// Max characters per document in the generation context
    pub max_doc_length: usize,
    /// Max total characters of the generation context
    pub max_context_length: usize,

    /// Below this best score no citation is attempted
    pub min_retrieval_score: f64,
    pub high_confidence_threshold: f64,
    pub medium_confidence_threshold: f64,

    pub max_image_bytes: usize,
    pub max_hazards: usize,

    /// Allowed categories; the last entry is the fallback category
    pub hazard_categories: Vec<String>,
    /// Allowed levels, least severe first
    pub hazard_levels: Vec<String>,
    /// Phrases the generation model uses to say no regulation applies
    pub not_found_markers: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch_k_multiplier: 50,
            rerank_top_n_multiplier: 10,
            rerank_score_threshold: 0.3,
            regulations_k: 5,
            regulations_score_threshold: 0.5,
            min_sufficient_docs: 2,
            hazard_db_k: 5,
            hazard_db_score_threshold: 0.4,
            max_combined_docs: 5,
            max_doc_length: 600,
            max_context_length: 3000,
            min_retrieval_score: 0.3,
            high_confidence_threshold: 0.7,
            medium_confidence_threshold: 0.5,
            max_image_bytes: 50 * 1024 * 1024,
            max_hazards: 5,
            hazard_categories: to_strings(&[
                "安全管理",
                "文明施工",
                "脚手架工程",
                "基坑工程",
                "模板工程",
                "高处作业",
                "安全防护",
                "施工用电",
                "起重吊装",
                "施工机具",
                "交叉作业",
                "有限空间",
                "生活营地",
                "危险物品管理",
                "爆破作业",
                "地下工程",
                "围堰工程",
                "施工道路与交通",
                "消防安全",
                "其他",
            ]),
            hazard_levels: to_strings(&["一般隐患", "重要隐患"]),
            not_found_markers: to_strings(&[
                "未找到相关规范",
                "未检索到相关规范",
                "暂无相关标准",
                "暂无相关规范",
                "无相关规范",
                "未找到相关标准",
                "没有相关规范",
                "没有找到相关",
            ]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Settings {
    /// Reject inconsistent settings before any component is built from them
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SafetyVisionError::Config(msg.to_string()));

        if self.fetch_k_multiplier == 0 || self.rerank_top_n_multiplier == 0 {
            return invalid("multipliers must be at least 1");
        }
        if self.regulations_k == 0 || self.hazard_db_k == 0 || self.max_combined_docs == 0 {
            return invalid("retrieval k and max_combined_docs must be at least 1");
        }
        if self.max_hazards == 0 {
            return invalid("max_hazards must be at least 1");
        }
        if self.hazard_categories.is_empty() || self.hazard_levels.is_empty() {
            return invalid("hazard_categories and hazard_levels must not be empty");
        }
        if self.medium_confidence_threshold > self.high_confidence_threshold {
            return invalid("medium_confidence_threshold must not exceed high_confidence_threshold");
        }
        let unit = [
            self.rerank_score_threshold,
            self.regulations_score_threshold,
            self.hazard_db_score_threshold,
            self.min_retrieval_score,
            self.high_confidence_threshold,
            self.medium_confidence_threshold,
        ];
        if unit.iter().any(|t| !(0.0..=1.0).contains(t)) {
            return invalid("score thresholds must lie in [0, 1]");
        }
        Ok(())
    }

    /// Category used when no model-chosen category is available
    pub fn fallback_category(&self) -> &str {
        self.hazard_categories.last().map(String::as_str).unwrap_or("其他")
    }

    /// Least severe configured level
    pub fn fallback_level(&self) -> &str {
        self.hazard_levels.first().map(String::as_str).unwrap_or("一般隐患")
    }
}
