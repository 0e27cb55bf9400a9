//! End-to-end analysis: image → hazards → grounded violations

use super::image::validate_image;
use super::types::{HazardFinding, HazardList, SafetyReport, SafetyViolation};
use super::violation::ViolationGenerator;
use crate::config::{Config, Settings};
use crate::error::{Result, SafetyVisionError};
use crate::index::{DocumentIndex, QdrantIndex};
use crate::llm::{
    generate_structured, ChatMessage, Embedder, HttpEmbedder, HttpReranker, JsonSchema,
    LLMClient, Reranker, VLLMClient,
};
use crate::retrieval::{ContextFormatter, MultiCollectionRetriever, RetrievalEngine};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;

const VISION_PROMPT: &str = "你是建筑施工安全检查专家。请识别图片中的安全隐患，\
按严重程度从高到低排列，每条用一句话简要描述隐患内容。没有隐患时返回空列表。";

/// Drives one analysis request through vision, retrieval and generation
pub struct SafetyAnalyzer {
    vision: Arc<dyn LLMClient>,
    retriever: MultiCollectionRetriever,
    formatter: ContextFormatter,
    generator: ViolationGenerator,
    settings: Arc<Settings>,
}

impl SafetyAnalyzer {
    pub fn builder() -> SafetyAnalyzerBuilder {
        SafetyAnalyzerBuilder::default()
    }

    /// Wire the HTTP adapters described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        config.settings.validate()?;

        let llm: Arc<dyn LLMClient> = Arc::new(VLLMClient::new(config.llm.clone())?);
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::from_config(config.llm.clone())?);

        let regulations = QdrantIndex::new(
            &config.index,
            config.index.regulations_collection.clone(),
            embedder.clone(),
        )?;

        let mut builder = Self::builder()
            .settings(config.settings.clone())
            .vision_client(llm)
            .regulations_index(Arc::new(regulations));

        if !config.index.hazard_db_collection.trim().is_empty() {
            let hazard_db = QdrantIndex::new(
                &config.index,
                config.index.hazard_db_collection.clone(),
                embedder,
            )?;
            builder = builder.hazard_db_index(Arc::new(hazard_db));
        }

        if let Some(reranker) = HttpReranker::from_config(&config.rerank)? {
            builder = builder.reranker(Arc::new(reranker));
        }

        builder.build()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn retriever(&self) -> &MultiCollectionRetriever {
        &self.retriever
    }

    pub fn formatter(&self) -> &ContextFormatter {
        &self.formatter
    }

    /// One violation per detected hazard, in severity order
    pub async fn analyze(&self, image: &[u8]) -> Result<Vec<SafetyViolation>> {
        let mime = validate_image(image, self.settings.max_image_bytes)?;

        let findings = self.extract_hazards(image, mime).await?;
        if findings.is_empty() {
            tracing::info!("no hazards detected");
            return Ok(Vec::new());
        }
        tracing::info!(hazards = findings.len(), "grounding hazards");

        let violations = join_all(findings.iter().map(|f| self.ground_hazard(f))).await;
        Ok(violations)
    }

    pub async fn analyze_report(&self, image: &[u8]) -> Result<SafetyReport> {
        Ok(SafetyReport::new(self.analyze(image).await?))
    }

    /// Single vision call; failures propagate
    pub async fn extract_hazards(&self, image: &[u8], mime: &str) -> Result<Vec<HazardFinding>> {
        let schema = JsonSchema::new(
            "hazard_list",
            json!({
                "type": "object",
                "properties": {
                    "hazards": {
                        "type": "array",
                        "items": {"type": "string"},
                        "maxItems": self.settings.max_hazards
                    }
                },
                "required": ["hazards"],
                "additionalProperties": false
            }),
        );

        let list: HazardList = generate_structured(
            self.vision.as_ref(),
            vec![ChatMessage::user_with_image(VISION_PROMPT, mime, image)],
            &schema,
        )
        .await?;

        Ok(list.into_findings(self.settings.max_hazards))
    }

    /// Retrieval, formatting and generation for one finding; never fails
    pub async fn ground_hazard(&self, finding: &HazardFinding) -> SafetyViolation {
        let chunks = self.retriever.retrieve_for_hazard(&finding.description).await;
        let context = self.formatter.format(&chunks);
        tracing::debug!(
            hazard_id = finding.hazard_id,
            documents = chunks.len(),
            max_score = context.max_score,
            "formatted context"
        );
        self.generator.generate(finding, &context).await
    }
}

/// Builder for [`SafetyAnalyzer`]
///
/// `vision_client` and `regulations_index` are required. The generation
/// client defaults to the vision client.
#[derive(Default)]
pub struct SafetyAnalyzerBuilder {
    settings: Option<Settings>,
    vision_client: Option<Arc<dyn LLMClient>>,
    generation_client: Option<Arc<dyn LLMClient>>,
    regulations_index: Option<Arc<dyn DocumentIndex>>,
    hazard_db_index: Option<Arc<dyn DocumentIndex>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl SafetyAnalyzerBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn vision_client(mut self, client: Arc<dyn LLMClient>) -> Self {
        self.vision_client = Some(client);
        self
    }

    pub fn generation_client(mut self, client: Arc<dyn LLMClient>) -> Self {
        self.generation_client = Some(client);
        self
    }

    pub fn regulations_index(mut self, index: Arc<dyn DocumentIndex>) -> Self {
        self.regulations_index = Some(index);
        self
    }

    pub fn hazard_db_index(mut self, index: Arc<dyn DocumentIndex>) -> Self {
        self.hazard_db_index = Some(index);
        self
    }

    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn build(self) -> Result<SafetyAnalyzer> {
        let settings = self.settings.unwrap_or_default();
        settings.validate()?;
        let settings = Arc::new(settings);

        let vision = self
            .vision_client
            .ok_or_else(|| SafetyVisionError::Config("vision_client is required".to_string()))?;
        let regulations_index = self.regulations_index.ok_or_else(|| {
            SafetyVisionError::Config("regulations_index is required".to_string())
        })?;
        let generation = self.generation_client.unwrap_or_else(|| vision.clone());

        let regulations =
            RetrievalEngine::new(regulations_index, self.reranker.clone(), settings.clone());
        let hazard_db = self
            .hazard_db_index
            .map(|index| RetrievalEngine::new(index, self.reranker.clone(), settings.clone()));

        Ok(SafetyAnalyzer {
            vision,
            retriever: MultiCollectionRetriever::new(regulations, hazard_db, settings.clone()),
            formatter: ContextFormatter::new(settings.clone()),
            generator: ViolationGenerator::new(generation, settings.clone()),
            settings,
        })
    }
}
