//! Topic-partitioned vector index backends.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use topicrag_core::config::{IndexBackend, IndexSettings};
use topicrag_core::VectorIndex;

pub mod lance;
pub mod memory;
pub mod schema;
pub mod similarity;

pub use lance::LanceIndex;
pub use memory::InMemoryIndex;

/// Open the backend selected by configuration. Relative data directories
/// resolve against `base`.
pub async fn open_index(settings: &IndexSettings, base: &Path) -> Result<Arc<dyn VectorIndex>> {
    match settings.backend {
        IndexBackend::Memory => {
            info!("using in-memory index");
            Ok(Arc::new(InMemoryIndex::new()))
        }
        IndexBackend::Lance => {
            let uri = settings.resolve_uri(base);
            Ok(Arc::new(LanceIndex::open(&uri).await?))
        }
    }
}
