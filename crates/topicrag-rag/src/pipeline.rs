use std::sync::Arc;
use tracing::{info, warn};

use topicrag_core::Result;
use topicrag_llm::{GenerationClient, GenerationError};

use crate::coordinator::RetrievalCoordinator;

/// Answer plus the context it was grounded on.
///
/// Generation failures stay typed in `answer`; retrieval failures are
/// returned as the outer error of [`RagPipeline::process_query`].
#[derive(Debug, Clone, PartialEq)]
pub struct RagResponse {
    pub answer: std::result::Result<String, GenerationError>,
    pub context_chunks: Vec<String>,
    pub count: usize,
}

pub struct RagPipeline {
    coordinator: Arc<RetrievalCoordinator>,
    generator: GenerationClient,
    default_limit: usize,
}

impl RagPipeline {
    pub fn new(coordinator: Arc<RetrievalCoordinator>, generator: GenerationClient, default_limit: usize) -> Self {
        Self { coordinator, generator, default_limit: default_limit.max(1) }
    }

    pub fn coordinator(&self) -> &RetrievalCoordinator {
        &self.coordinator
    }

    pub fn generator_mut(&mut self) -> &mut GenerationClient {
        &mut self.generator
    }

    pub async fn get_context(&self, query: &str, topic: Option<&str>, limit: usize) -> Result<Vec<String>> {
        self.coordinator.get_context(query, topic, limit).await
    }

    /// Generate from `context`, retrieving across all topics first when it
    /// is missing or empty.
    pub async fn generate_answer(
        &self,
        query: &str,
        context: Option<Vec<String>>,
    ) -> Result<std::result::Result<String, GenerationError>> {
        let context = match context {
            Some(chunks) if !chunks.is_empty() => chunks,
            _ => self.coordinator.get_context(query, None, self.default_limit).await?,
        };
        Ok(self.generate(query, &context).await)
    }

    /// Retrieve, then generate. Every call re-embeds and re-queries.
    pub async fn process_query(&self, query: &str, topic: Option<&str>, limit: usize) -> Result<RagResponse> {
        let context_chunks = self.coordinator.get_context(query, topic, limit).await?;
        let answer = self.generate(query, &context_chunks).await;
        let count = context_chunks.len();
        info!(topic = topic.unwrap_or("*"), context = count, answered = answer.is_ok(), "processed query");
        Ok(RagResponse { answer, context_chunks, count })
    }

    async fn generate(&self, query: &str, context: &[String]) -> std::result::Result<String, GenerationError> {
        let answer = self.generator.answer(query, context).await;
        if let Err(e) = &answer {
            warn!(error = %e, "generation failed");
        }
        answer
    }
}
