use std::sync::Arc;
use tracing::{debug, info};

use topicrag_core::{
    check_partition_name, Chunk, ContentKind, Embedder, Error, IndexItem, Result, ScoredItem, Segmenter, VectorIndex,
};

/// Outcome of ingesting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub filename: String,
    pub topic: String,
    pub chunk_count: usize,
}

/// Stateless orchestration over a shared embedder and index.
///
/// Ingestion runs segment, embed, upsert. Retrieval embeds the query once
/// and asks either one topic or all of them.
pub struct RetrievalCoordinator {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    segmenter: Segmenter,
    allowed_topics: Vec<String>,
    embed_batch_size: usize,
}

const DEFAULT_EMBED_BATCH: usize = 32;

impl RetrievalCoordinator {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, segmenter: Segmenter) -> Self {
        Self { embedder, index, segmenter, allowed_topics: Vec::new(), embed_batch_size: DEFAULT_EMBED_BATCH }
    }

    /// Restrict ingestion to a closed set of topics. An empty list allows any
    /// valid name.
    #[must_use]
    pub fn with_allowed_topics(mut self, topics: Vec<String>) -> Self {
        self.allowed_topics = topics;
        self
    }

    /// Upper bound on texts handed to the embedder in one call.
    #[must_use]
    pub fn with_embed_batch_size(mut self, batch_size: usize) -> Self {
        self.embed_batch_size = batch_size.max(1);
        self
    }

    pub fn check_topic(&self, topic: &str) -> Result<()> {
        check_partition_name(topic)?;
        if !self.allowed_topics.is_empty() && !self.allowed_topics.iter().any(|t| t == topic) {
            return Err(Error::TopicNotAllowed(topic.to_string()));
        }
        Ok(())
    }

    /// Ingest a file whose kind is inferred from its extension.
    pub async fn ingest_file(&self, content: &[u8], filename: &str, topic: &str) -> Result<IngestReport> {
        let kind = ContentKind::from_filename(filename)?;
        self.ingest(content, kind, filename, topic).await
    }

    pub async fn ingest(&self, content: &[u8], kind: ContentKind, filename: &str, topic: &str) -> Result<IngestReport> {
        self.check_topic(topic)?;
        let chunks = self.segmenter.segment(content, kind);
        self.index.ensure_partition(topic, self.embedder.dim()).await?;
        let chunk_count = self.store(chunks, filename, topic).await?;
        info!(filename, topic, chunks = chunk_count, "ingested");
        Ok(IngestReport { filename: filename.to_string(), topic: topic.to_string(), chunk_count })
    }

    async fn store(&self, chunks: Vec<Chunk>, filename: &str, topic: &str) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed(texts).await?;
        let items: Vec<IndexItem> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let mut metadata = chunk.origin_metadata;
                metadata.insert("filename".to_string(), filename.to_string());
                metadata.insert("topic".to_string(), topic.to_string());
                IndexItem {
                    id: format!("{filename}:{}", chunk.sequence_index),
                    vector,
                    text: chunk.text,
                    metadata,
                }
            })
            .collect();
        let count = items.len();
        self.index.upsert(topic, items).await?;
        Ok(count)
    }

    /// Embed on the blocking pool in slices of `embed_batch_size`; a short or
    /// ragged result fails the whole set.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        let expected = texts.len();
        let dim = embedder.dim();
        let batch_size = self.embed_batch_size;
        let vectors = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for batch in texts.chunks(batch_size) {
                out.extend(embedder.embed_batch(batch)?);
            }
            Ok(out)
        })
        .await
        .map_err(|e| Error::Embedding(e.into()))?
        .map_err(Error::Embedding)?;
        if vectors.len() != expected {
            return Err(Error::Embedding(anyhow::anyhow!(
                "embedder returned {} vectors for {expected} texts",
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::Embedding(anyhow::anyhow!(
                "embedder returned a {}-dimensional vector, expected {dim}",
                bad.len()
            )));
        }
        Ok(vectors)
    }

    /// Ranked records with score and provenance.
    pub async fn retrieve(&self, query: &str, topic: Option<&str>, limit: usize) -> Result<Vec<ScoredItem>> {
        if let Some(topic) = topic {
            check_partition_name(topic)?;
        }
        let mut vectors = self.embed(vec![query.to_string()]).await?;
        let query_vector = vectors.pop().unwrap_or_default();
        let hits = match topic {
            Some(topic) => self.index.query(topic, &query_vector, limit).await?,
            None => self.index.query_all(&query_vector, limit).await?,
        };
        debug!(topic = topic.unwrap_or("*"), limit, hits = hits.len(), "retrieved");
        Ok(hits)
    }

    /// Text of the ranked records, best first.
    pub async fn get_context(&self, query: &str, topic: Option<&str>, limit: usize) -> Result<Vec<String>> {
        let hits = self.retrieve(query, topic, limit).await?;
        Ok(hits.into_iter().map(|h| h.text).collect())
    }

    pub async fn list_topics(&self) -> Result<Vec<String>> {
        let mut topics = self.index.list_partitions().await?;
        topics.sort();
        Ok(topics)
    }

    pub async fn topic_size(&self, topic: &str) -> Result<usize> {
        self.index.item_count(topic).await
    }
}
