//! Embedding providers behind [`topicrag_core::Embedder`].

use anyhow::Result;
use std::sync::Arc;

use topicrag_core::config::{expand_path, EmbeddingProvider, EmbeddingSettings};
use topicrag_core::Embedder;
use tracing::info;

pub mod bert;
pub mod device;
pub mod hash;
pub mod pool;
pub mod tokenize;

pub use bert::BertEmbedder;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;

/// Build the embedder selected by configuration. Constructed once at startup
/// and shared by every request.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider {
        EmbeddingProvider::Hash => {
            info!(dim = settings.hash_dim, "using hashing embedder");
            Ok(Arc::new(HashEmbedder::new(settings.hash_dim)))
        }
        EmbeddingProvider::Bert => {
            let dir = expand_path(&settings.model_dir);
            Ok(Arc::new(BertEmbedder::load(&dir, settings.max_len)?))
        }
    }
}
