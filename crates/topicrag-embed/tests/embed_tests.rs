use topicrag_core::config::{EmbeddingProvider, EmbeddingSettings};
use topicrag_embed::get_default_embedder;

fn hash_settings(dim: usize) -> EmbeddingSettings {
    EmbeddingSettings { provider: EmbeddingProvider::Hash, hash_dim: dim, ..EmbeddingSettings::default() }
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = get_default_embedder(&hash_settings(384)).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string(), "other".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 3, "one vector per input, in order");
    assert_eq!(embedder.dim(), 384);
    assert!(embs.iter().all(|v| v.len() == 384));

    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    assert_eq!(embs[0], embs[1]);
    assert_ne!(embs[0], embs[2]);
}

#[test]
fn bert_provider_reports_missing_model_files() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let settings = EmbeddingSettings {
        provider: EmbeddingProvider::Bert,
        model_dir: tmp.path().to_string_lossy().to_string(),
        ..EmbeddingSettings::default()
    };
    let err = get_default_embedder(&settings).err().expect("no weights present");
    assert!(err.to_string().contains("model.safetensors"), "{err}");
}
