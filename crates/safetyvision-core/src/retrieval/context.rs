//! Generation context built from a retrieval result

use crate::config::Settings;
use crate::index::{Chunk, ChunkMetadata};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

pub const NO_DOCUMENTS_CONTEXT: &str = "未检索到相关规范文档。";
pub const NO_DOCUMENTS_SOURCES: &str = "无参考文档";
const UNKNOWN_SOURCE: &str = "未知来源";
const UNKNOWN_LOCATION: &str = "位置未知";
const SEPARATOR: &str = "\n---\n";

/// Where a cited passage came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceReference {
    pub filename: String,
    pub location: String,
}

impl SourceReference {
    pub fn from_metadata(metadata: &ChunkMetadata) -> Self {
        Self {
            filename: metadata
                .filename
                .clone()
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
            location: describe_location(metadata),
        }
    }
}

/// Bounded context and citations for one hazard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedContext {
    pub context: String,
    pub sources: String,
    pub source_refs: Vec<SourceReference>,
    pub max_score: f64,
    pub is_high_confidence: bool,
}

impl FormattedContext {
    pub fn is_empty(&self) -> bool {
        self.source_refs.is_empty()
    }
}

/// Location priority: sheet and rows, then 1-based page, then section heading
pub fn describe_location(metadata: &ChunkMetadata) -> String {
    fn non_empty(s: &Option<String>) -> Option<&str> {
        s.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    if let Some(sheet) = non_empty(&metadata.sheet_name) {
        return match non_empty(&metadata.row_range) {
            Some(rows) => format!("工作表: {}, 行: {}", sheet, rows),
            None => format!("工作表: {}", sheet),
        };
    }
    if let Some(page) = metadata.page {
        return format!("第{}页", page + 1);
    }
    if let Some(section) = non_empty(&metadata.section) {
        return format!("章节: {}", section);
    }
    UNKNOWN_LOCATION.to_string()
}

/// Turns ranked chunks into the text handed to the generation model
#[derive(Debug, Clone)]
pub struct ContextFormatter {
    settings: Arc<Settings>,
}

impl ContextFormatter {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    pub fn format(&self, chunks: &[Chunk]) -> FormattedContext {
        if chunks.is_empty() {
            return FormattedContext {
                context: NO_DOCUMENTS_CONTEXT.to_string(),
                sources: NO_DOCUMENTS_SOURCES.to_string(),
                source_refs: Vec::new(),
                max_score: 0.0,
                is_high_confidence: false,
            };
        }

        let mut context = String::new();
        let mut context_chars = 0;
        let mut seen = HashSet::new();
        let mut source_refs = Vec::new();
        let mut source_lines = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let entry = format!(
                "[文档{}] (相关度: {:.3})\n{}",
                i + 1,
                chunk.score,
                truncate_chars(&chunk.content, self.settings.max_doc_length)
            );
            let entry_chars = entry.chars().count();
            let separator_chars = if context.is_empty() { 0 } else { SEPARATOR.chars().count() };

            // The first entry is always kept; later ones only while the budget allows
            if !context.is_empty()
                && context_chars + separator_chars + entry_chars > self.settings.max_context_length
            {
                break;
            }
            if !context.is_empty() {
                context.push_str(SEPARATOR);
            }
            context.push_str(&entry);
            context_chars += separator_chars + entry_chars;

            let reference = SourceReference::from_metadata(&chunk.metadata);
            if seen.insert(reference.clone()) {
                source_lines.push(format!("- {} ({})", reference.filename, reference.location));
                source_refs.push(reference);
            }
        }

        let max_score = chunks
            .iter()
            .map(|c| c.score)
            .fold(f64::NEG_INFINITY, f64::max);

        FormattedContext {
            context,
            sources: source_lines.join("\n"),
            source_refs,
            max_score,
            is_high_confidence: max_score >= self.settings.high_confidence_threshold,
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
