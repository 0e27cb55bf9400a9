//! Per-hazard grounding decision and violation assembly
//!
//! Each hazard moves through one of four outcomes:
//! below the retrieval floor (no model call), accepted with a citation,
//! rejected by the model as not relevant, or generation failed. Every path
//! yields exactly one [`SafetyViolation`]; errors never reach the caller.

use super::types::{HazardFinding, SafetyViolation};
use crate::config::Settings;
use crate::error::{Result, SafetyVisionError};
use crate::llm::{generate_structured, ChatMessage, JsonSchema, LLMClient};
use crate::retrieval::FormattedContext;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

const FLOOR_RECOMMENDATION: &str =
    "未检索到足够相关的规范依据，请安全管理人员现场核查该隐患，并参照现行安全规范进行整改。";
const LENGTH_LIMIT_RECOMMENDATION: &str =
    "报告生成超出模型输出长度限制，请立即排查并消除该隐患，必要时简化隐患描述后重新分析。";
const FAILURE_RECOMMENDATION: &str =
    "报告生成服务暂不可用，请立即排查并消除该隐患，由安全管理人员对照相关规范人工确认整改措施。";

/// Error substrings identifying a token/length-limit failure
const LENGTH_LIMIT_MARKERS: &[&str] = &[
    "max_tokens",
    "max_completion_tokens",
    "maximum context length",
    "token limit",
    "finish_reason: length",
];

/// How strictly the model should judge relevance of the retrieved context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn classify(max_score: f64, settings: &Settings) -> Self {
        if max_score >= settings.high_confidence_threshold {
            Self::High
        } else if max_score >= settings.medium_confidence_threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }

    fn guidance(&self) -> &'static str {
        match self {
            Self::High => "检索结果相关度较高，可直接引用与隐患对应的规范条款。",
            Self::Medium => {
                "检索结果相关度中等，请逐条核对规范内容是否确实针对该隐患，仅引用直接相关的条款。"
            }
            Self::Low => {
                "检索结果相关度较低，请严格判断；若规范内容与隐患无直接关系，rule_reference 必须填写\"未找到相关规范\"。"
            }
        }
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Which path produced a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundingOutcome {
    BelowFloor,
    Accepted,
    RejectedByModel,
    GenerationFailed { length_limit: bool },
}

#[derive(Debug, Deserialize)]
struct GeneratedViolation {
    hazard_category: String,
    hazard_level: String,
    recommendations: String,
    rule_reference: String,
}

/// Builds one violation per hazard from its formatted context
pub struct ViolationGenerator {
    client: Arc<dyn LLMClient>,
    settings: Arc<Settings>,
}

impl ViolationGenerator {
    pub fn new(client: Arc<dyn LLMClient>, settings: Arc<Settings>) -> Self {
        Self { client, settings }
    }

    pub async fn generate(
        &self,
        finding: &HazardFinding,
        context: &FormattedContext,
    ) -> SafetyViolation {
        self.generate_with_outcome(finding, context).await.0
    }

    pub async fn generate_with_outcome(
        &self,
        finding: &HazardFinding,
        context: &FormattedContext,
    ) -> (SafetyViolation, GroundingOutcome) {
        if context.max_score < self.settings.min_retrieval_score {
            tracing::info!(
                hazard_id = finding.hazard_id,
                max_score = context.max_score,
                floor = self.settings.min_retrieval_score,
                "retrieval below floor, skipping generation"
            );
            return (self.below_floor(finding, context), GroundingOutcome::BelowFloor);
        }

        let band = ConfidenceBand::classify(context.max_score, &self.settings);
        match self.request(finding, context, band).await {
            Ok(generated) => self.assemble(finding, context, generated),
            Err(e) => {
                let message = e.to_string();
                let length_limit = LENGTH_LIMIT_MARKERS.iter().any(|m| message.contains(m));
                tracing::warn!(
                    hazard_id = finding.hazard_id,
                    length_limit,
                    error = %message,
                    "violation generation failed, using fallback"
                );
                (
                    self.generation_failed(finding, length_limit),
                    GroundingOutcome::GenerationFailed { length_limit },
                )
            }
        }
    }

    async fn request(
        &self,
        finding: &HazardFinding,
        context: &FormattedContext,
        band: ConfidenceBand,
    ) -> Result<GeneratedViolation> {
        let system = format!(
            "你是建筑施工安全报告生成器。根据检索到的规范为给定隐患生成结构化违规记录。\n\
             {}\n\
             rule_reference 格式：《标准名称》(标准编号) 第X.X.X条规定：具体内容。来自文档：文件名。\n\
             若规范与隐患无关，rule_reference 填写\"未找到相关规范\"。",
            band.guidance()
        );
        let user = format!(
            "相关规范:\n{}\n\n参考文档来源:\n{}\n\n检索最高相关度: {:.3}\n\n发现的隐患:\n{}",
            context.context, context.sources, context.max_score, finding.description
        );

        let generated: GeneratedViolation = generate_structured(
            self.client.as_ref(),
            vec![ChatMessage::system(system), ChatMessage::user(user)],
            &self.schema(),
        )
        .await?;

        if !self.settings.hazard_categories.contains(&generated.hazard_category) {
            return Err(SafetyVisionError::Generation(format!(
                "unknown hazard category '{}'",
                generated.hazard_category
            )));
        }
        if !self.settings.hazard_levels.contains(&generated.hazard_level) {
            return Err(SafetyVisionError::Generation(format!(
                "unknown hazard level '{}'",
                generated.hazard_level
            )));
        }
        Ok(generated)
    }

    fn schema(&self) -> JsonSchema {
        JsonSchema::new(
            "safety_violation",
            json!({
                "type": "object",
                "properties": {
                    "hazard_category": {"type": "string", "enum": self.settings.hazard_categories},
                    "hazard_level": {"type": "string", "enum": self.settings.hazard_levels},
                    "recommendations": {"type": "string"},
                    "rule_reference": {"type": "string"}
                },
                "required": ["hazard_category", "hazard_level", "recommendations", "rule_reference"],
                "additionalProperties": false
            }),
        )
    }

    fn assemble(
        &self,
        finding: &HazardFinding,
        context: &FormattedContext,
        generated: GeneratedViolation,
    ) -> (SafetyViolation, GroundingOutcome) {
        let not_relevant = self
            .settings
            .not_found_markers
            .iter()
            .any(|m| generated.rule_reference.contains(m.as_str()));

        let (rule_reference, source_documents, outcome) = if not_relevant {
            tracing::info!(
                hazard_id = finding.hazard_id,
                max_score = context.max_score,
                "model found no relevant regulation"
            );
            (
                format!(
                    "未找到与该隐患直接相关的规范条款（检索最高相关度 {:.2}）",
                    context.max_score
                ),
                Vec::new(),
                GroundingOutcome::RejectedByModel,
            )
        } else {
            (
                generated.rule_reference,
                context.source_refs.clone(),
                GroundingOutcome::Accepted,
            )
        };

        (
            SafetyViolation {
                hazard_id: finding.hazard_id,
                hazard_description: finding.description.clone(),
                hazard_category: generated.hazard_category,
                hazard_level: generated.hazard_level,
                recommendations: generated.recommendations,
                rule_reference,
                source_documents,
            },
            outcome,
        )
    }

    fn below_floor(&self, finding: &HazardFinding, context: &FormattedContext) -> SafetyViolation {
        self.fallback(
            finding,
            FLOOR_RECOMMENDATION,
            format!(
                "检索相关度过低（最高 {:.2}，低于阈值 {:.2}），未找到可引用的相关规范",
                context.max_score, self.settings.min_retrieval_score
            ),
        )
    }

    fn generation_failed(&self, finding: &HazardFinding, length_limit: bool) -> SafetyViolation {
        if length_limit {
            self.fallback(
                finding,
                LENGTH_LIMIT_RECOMMENDATION,
                "报告生成超出模型输出长度限制（max_tokens），未能完成规范引用".to_string(),
            )
        } else {
            self.fallback(
                finding,
                FAILURE_RECOMMENDATION,
                "报告生成失败，未能完成规范引用".to_string(),
            )
        }
    }

    fn fallback(
        &self,
        finding: &HazardFinding,
        recommendations: &str,
        rule_reference: String,
    ) -> SafetyViolation {
        SafetyViolation {
            hazard_id: finding.hazard_id,
            hazard_description: finding.description.clone(),
            hazard_category: self.settings.fallback_category().to_string(),
            hazard_level: self.settings.fallback_level().to_string(),
            recommendations: recommendations.to_string(),
            rule_reference,
            source_documents: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::ContextFormatter;
    use crate::test_support::{chunk, StubLLM};

    fn settings() -> Arc<Settings> {
        Arc::new(Settings::default())
    }

    fn finding() -> HazardFinding {
        HazardFinding {
            hazard_id: 1,
            description: "missing hard hat".to_string(),
        }
    }

    fn context(scores: &[f64]) -> FormattedContext {
        let chunks: Vec<_> = scores
            .iter()
            .map(|s| chunk("JGJ59-2011.pdf", "进入施工现场必须佩戴安全帽", *s))
            .collect();
        ContextFormatter::new(settings()).format(&chunks)
    }

    fn answer(rule_reference: &str) -> serde_json::Value {
        json!({
            "hazard_category": "安全防护",
            "hazard_level": "重要隐患",
            "recommendations": "立即佩戴安全帽",
            "rule_reference": rule_reference
        })
    }

    #[test]
    fn test_confidence_bands() {
        let s = Settings::default();
        assert_eq!(ConfidenceBand::classify(0.8, &s), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::classify(0.7, &s), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::classify(0.55, &s), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::classify(0.35, &s), ConfidenceBand::Low);
    }

    #[tokio::test]
    async fn test_below_floor_skips_model() {
        let llm = Arc::new(StubLLM::returning(answer("《JGJ59》第3条")));
        let generator = ViolationGenerator::new(llm.clone(), settings());

        let (violation, outcome) = generator
            .generate_with_outcome(&finding(), &context(&[0.12]))
            .await;

        assert_eq!(outcome, GroundingOutcome::BelowFloor);
        assert_eq!(llm.calls(), 0);
        assert!(violation.source_documents.is_empty());
        assert!(violation.rule_reference.contains("0.12"));
        assert_eq!(violation.hazard_category, "其他");
        assert_eq!(violation.hazard_level, "一般隐患");
        assert_eq!(violation.hazard_description, "missing hard hat");
    }

    #[tokio::test]
    async fn test_score_at_floor_attempts_generation() {
        let llm = Arc::new(StubLLM::returning(answer("《JGJ59-2011》第3.1条")));
        let generator = ViolationGenerator::new(llm.clone(), settings());

        let (_, outcome) = generator
            .generate_with_outcome(&finding(), &context(&[0.3]))
            .await;

        assert_eq!(llm.calls(), 1);
        assert_ne!(outcome, GroundingOutcome::BelowFloor);
    }

    #[tokio::test]
    async fn test_empty_context_is_below_floor() {
        let llm = Arc::new(StubLLM::returning(answer("x")));
        let generator = ViolationGenerator::new(llm.clone(), settings());
        let (violation, outcome) = generator.generate_with_outcome(&finding(), &context(&[])).await;
        assert_eq!(outcome, GroundingOutcome::BelowFloor);
        assert!(violation.rule_reference.contains("0.00"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_rejection_clears_sources() {
        let llm = Arc::new(StubLLM::returning(answer("未检索到相关规范")));
        let generator = ViolationGenerator::new(llm.clone(), settings());

        let (violation, outcome) = generator
            .generate_with_outcome(&finding(), &context(&[0.8, 0.75, 0.6]))
            .await;

        assert_eq!(outcome, GroundingOutcome::RejectedByModel);
        assert!(violation.source_documents.is_empty());
        assert!(violation.rule_reference.contains("0.80"));
        assert_eq!(violation.hazard_category, "安全防护");
        // High band guidance reached the model
        assert!(llm.prompts()[0].contains("相关度较高"));
    }

    #[tokio::test]
    async fn test_accepted_citation_kept_verbatim() {
        let citation = "《建筑施工安全检查标准》(JGJ59-2011) 第3.1条规定：必须佩戴安全帽。来自文档：JGJ59-2011.pdf";
        let llm = Arc::new(StubLLM::returning(answer(citation)));
        let generator = ViolationGenerator::new(llm, settings());

        let (violation, outcome) = generator
            .generate_with_outcome(&finding(), &context(&[0.6]))
            .await;

        assert_eq!(outcome, GroundingOutcome::Accepted);
        assert_eq!(violation.rule_reference, citation);
        assert_eq!(violation.source_documents.len(), 1);
        assert_eq!(violation.source_documents[0].filename, "JGJ59-2011.pdf");
    }

    #[tokio::test]
    async fn test_length_limit_failure_is_distinguished() {
        let generator = ViolationGenerator::new(
            Arc::new(StubLLM::failing("completion truncated: max_tokens limit (4096) reached")),
            settings(),
        );
        let (length, outcome) = generator
            .generate_with_outcome(&finding(), &context(&[0.6]))
            .await;
        assert_eq!(outcome, GroundingOutcome::GenerationFailed { length_limit: true });

        let generator = ViolationGenerator::new(
            Arc::new(StubLLM::failing("connection refused")),
            settings(),
        );
        let (generic, outcome) = generator
            .generate_with_outcome(&finding(), &context(&[0.6]))
            .await;
        assert_eq!(outcome, GroundingOutcome::GenerationFailed { length_limit: false });

        assert!(length.rule_reference.contains("max_tokens"));
        assert_ne!(length.rule_reference, generic.rule_reference);
        assert_ne!(length.recommendations, generic.recommendations);
        assert!(length.source_documents.is_empty());
        assert!(generic.source_documents.is_empty());
        assert_eq!(generic.hazard_description, "missing hard hat");
    }

    #[tokio::test]
    async fn test_unknown_category_degrades_to_failure() {
        let llm = Arc::new(StubLLM::returning(json!({
            "hazard_category": "不存在的类别",
            "hazard_level": "重要隐患",
            "recommendations": "r",
            "rule_reference": "《JGJ59》"
        })));
        let generator = ViolationGenerator::new(llm, settings());
        let (violation, outcome) = generator
            .generate_with_outcome(&finding(), &context(&[0.9]))
            .await;
        assert_eq!(outcome, GroundingOutcome::GenerationFailed { length_limit: false });
        assert_eq!(violation.hazard_category, "其他");
    }

    #[tokio::test]
    async fn test_malformed_response_degrades_to_failure() {
        let llm = Arc::new(StubLLM::returning(json!({"rule_reference": 3})));
        let generator = ViolationGenerator::new(llm, settings());
        let violation = generator.generate(&finding(), &context(&[0.9])).await;
        assert!(violation.source_documents.is_empty());
    }
}
