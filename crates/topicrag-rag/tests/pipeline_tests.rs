use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use topicrag_core::config::{GenerationSettings, SegmentSettings};
use topicrag_core::{Embedder, Error, Segmenter, VectorIndex};
use topicrag_embed::HashEmbedder;
use topicrag_llm::{GenerationClient, GenerationError, ScriptedTransport};
use topicrag_rag::{RagPipeline, RetrievalCoordinator};
use topicrag_vector::InMemoryIndex;

const DOC: &str = "The pressure canner must vent steam for ten minutes before sealing.\n\n\
                   Store the dried beans in airtight jars away from light.";

fn coordinator() -> RetrievalCoordinator {
    let segmenter = Segmenter::new(SegmentSettings::default()).expect("segmenter");
    RetrievalCoordinator::new(Arc::new(HashEmbedder::new(256)), Arc::new(InMemoryIndex::new()), segmenter)
}

fn pipeline(coordinator: RetrievalCoordinator, transport: &Arc<ScriptedTransport>) -> RagPipeline {
    let settings = GenerationSettings { api_key: Some("sk-test".to_string()), max_retries: 1, ..Default::default() };
    let generator = GenerationClient::with_transport(transport.clone(), &settings);
    RagPipeline::new(Arc::new(coordinator), generator, 5)
}

#[tokio::test]
async fn two_paragraphs_are_retrievable_from_their_topic() {
    let rag = coordinator();
    let report = rag.ingest_file(DOC.as_bytes(), "canning.md", "docs").await.unwrap();
    assert_eq!(report.chunk_count, 2);
    assert_eq!(rag.topic_size("docs").await.unwrap(), 2);

    let context = rag.get_context("unrelated query", Some("docs"), 5).await.unwrap();
    assert!(!context.is_empty());
    let paragraphs: Vec<&str> = DOC.split("\n\n").map(str::trim).collect();
    assert!(paragraphs.contains(&context[0].as_str()), "top hit is an original paragraph: {:?}", context[0]);
}

#[tokio::test]
async fn related_query_ranks_matching_paragraph_first() {
    let rag = coordinator();
    rag.ingest_file(DOC.as_bytes(), "canning.md", "docs").await.unwrap();
    let hits = rag.retrieve("how long should the canner vent steam", Some("docs"), 2).await.unwrap();
    assert!(hits[0].text.starts_with("The pressure canner"));
    assert_eq!(hits[0].metadata.get("filename").map(String::as_str), Some("canning.md"));
    assert_eq!(hits[0].metadata.get("topic").map(String::as_str), Some("docs"));
    assert_eq!(hits[0].id, "canning.md:0");
}

#[tokio::test]
async fn reingesting_a_file_overwrites_its_chunks() {
    let rag = coordinator();
    rag.ingest_file(DOC.as_bytes(), "canning.md", "docs").await.unwrap();
    rag.ingest_file(DOC.as_bytes(), "canning.md", "docs").await.unwrap();
    assert_eq!(rag.topic_size("docs").await.unwrap(), 2);
}

#[tokio::test]
async fn unsupported_extension_and_unknown_topic_are_client_errors() {
    let rag = coordinator();
    let err = rag.ingest_file(b"data", "photo.jpg", "docs").await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
    assert!(err.is_client_error());

    let err = rag.get_context("anything", Some("missing"), 3).await.unwrap_err();
    assert!(matches!(err, Error::UnknownPartition(_)));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn closed_topic_set_rejects_other_topics() {
    let rag = coordinator().with_allowed_topics(vec!["docs".to_string()]);
    assert!(rag.ingest_file(DOC.as_bytes(), "a.md", "docs").await.is_ok());
    assert!(matches!(rag.ingest_file(DOC.as_bytes(), "a.md", "recipes").await, Err(Error::TopicNotAllowed(_))));
    assert!(matches!(rag.ingest_file(DOC.as_bytes(), "a.md", "bad topic").await, Err(Error::InvalidPartitionName(_))));
}

#[tokio::test]
async fn unscoped_search_spans_topics() {
    let rag = coordinator();
    rag.ingest_file(b"def vent_canner():\n    return 10\n", "canner.py", "code").await.unwrap();
    rag.ingest_file(DOC.as_bytes(), "canning.md", "docs").await.unwrap();
    assert_eq!(rag.list_topics().await.unwrap(), vec!["code".to_string(), "docs".to_string()]);

    let hits = rag.retrieve("airtight jars for dried beans", None, 3).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].partition, "docs");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn process_query_returns_answer_and_provenance() {
    let transport = Arc::new(ScriptedTransport::new().complete("Vent for ten minutes."));
    let coordinator = coordinator();
    coordinator.ingest_file(DOC.as_bytes(), "canning.md", "docs").await.unwrap();
    let rag = pipeline(coordinator, &transport);

    let response = rag.process_query("how long to vent the canner", Some("docs"), 1).await.unwrap();
    assert_eq!(response.answer, Ok("Vent for ten minutes.".to_string()));
    assert_eq!(response.count, 1);
    assert_eq!(response.context_chunks.len(), 1);
    let prompt = &transport.requests()[0].messages[1].content;
    assert!(prompt.contains(&response.context_chunks[0]));
}

#[tokio::test]
async fn generation_failure_stays_typed_next_to_context() {
    let transport = Arc::new(ScriptedTransport::new().respond(429, r#"{"error":{"message":"busy"}}"#));
    let coordinator = coordinator();
    coordinator.ingest_file(DOC.as_bytes(), "canning.md", "docs").await.unwrap();
    let rag = pipeline(coordinator, &transport);

    let response = rag.process_query("beans", None, 5).await.unwrap();
    assert!(matches!(response.answer, Err(GenerationError::RateLimitExceeded { .. })));
    assert_eq!(response.count, 2);
}

#[tokio::test]
async fn generate_answer_retrieves_when_context_is_missing() {
    let transport = Arc::new(ScriptedTransport::new().complete("first").complete("second"));
    let coordinator = coordinator();
    coordinator.ingest_file(DOC.as_bytes(), "canning.md", "docs").await.unwrap();
    let rag = pipeline(coordinator, &transport);

    rag.generate_answer("beans", Some(vec!["given context".to_string()])).await.unwrap().unwrap();
    rag.generate_answer("beans", Some(Vec::new())).await.unwrap().unwrap();

    let requests = transport.requests();
    assert!(requests[0].messages[1].content.contains("given context"));
    assert!(requests[1].messages[1].content.contains("airtight jars"));
}

/// Returns one vector fewer than asked for.
struct ShortEmbedder;

impl Embedder for ShortEmbedder {
    fn dim(&self) -> usize {
        4
    }

    fn max_len(&self) -> usize {
        16
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0; 4]).collect())
    }
}

#[tokio::test]
async fn partial_embedding_sets_are_rejected() {
    let index = Arc::new(InMemoryIndex::new());
    let segmenter = Segmenter::new(SegmentSettings::default()).expect("segmenter");
    let rag = RetrievalCoordinator::new(Arc::new(ShortEmbedder), index.clone(), segmenter);
    let err = rag.ingest_file(DOC.as_bytes(), "canning.md", "docs").await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));
    assert_eq!(index.item_count("docs").await.unwrap(), 0);
}

#[tokio::test]
async fn same_base_name_in_different_directories_keeps_both_files() {
    let rag = coordinator();
    rag.ingest_file(DOC.as_bytes(), "a/README.md", "docs").await.unwrap();
    rag.ingest_file(b"Rotate the compost weekly.\n\nKeep it damp but not wet.", "b/README.md", "docs")
        .await
        .unwrap();
    assert_eq!(rag.topic_size("docs").await.unwrap(), 4);

    let hits = rag.retrieve("compost rotation", Some("docs"), 4).await.unwrap();
    let mut ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["a/README.md:0", "a/README.md:1", "b/README.md:0", "b/README.md:1"]);
}

#[tokio::test]
async fn malformed_topic_on_scoped_query_is_a_client_error() {
    let rag = coordinator();
    let err = rag.get_context("anything", Some("bad topic"), 3).await.unwrap_err();
    assert!(matches!(err, Error::InvalidPartitionName(_)));
    assert!(err.is_client_error());
}

/// Hash embedder that records the largest batch it was handed.
struct BatchRecorder {
    inner: HashEmbedder,
    largest: AtomicUsize,
    calls: AtomicUsize,
}

impl Embedder for BatchRecorder {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_len(&self) -> usize {
        self.inner.max_len()
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.largest.fetch_max(texts.len(), Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }
}

#[tokio::test]
async fn ingestion_embeds_in_bounded_batches() {
    let embedder = Arc::new(BatchRecorder {
        inner: HashEmbedder::new(64),
        largest: AtomicUsize::new(0),
        calls: AtomicUsize::new(0),
    });
    let segmenter = Segmenter::new(SegmentSettings::default()).expect("segmenter");
    let rag = RetrievalCoordinator::new(embedder.clone(), Arc::new(InMemoryIndex::new()), segmenter)
        .with_embed_batch_size(4);

    let doc: String = (0..10).map(|i| format!("Paragraph number {i} about seeds.")).collect::<Vec<_>>().join("\n\n");
    let report = rag.ingest_file(doc.as_bytes(), "seeds.txt", "garden").await.unwrap();

    assert_eq!(report.chunk_count, 10);
    assert_eq!(rag.topic_size("garden").await.unwrap(), 10);
    assert_eq!(embedder.largest.load(Ordering::SeqCst), 4);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
}
