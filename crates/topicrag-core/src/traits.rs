use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::ranking::merge_ranked;
use crate::types::{IndexItem, ScoredItem};

/// Maps texts to fixed-dimension vectors. Must be deterministic for identical
/// input and model configuration.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Topic-partitioned similarity index.
///
/// Implementations own partition lifecycle and their own internal locking;
/// handles are shared across concurrent requests.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Idempotent create. First writer wins when two callers race on the
    /// same name; the loser sees the existing partition.
    async fn ensure_partition(&self, name: &str, dimension: usize) -> Result<()>;

    /// Validates every vector before writing anything, so a rejected batch
    /// leaves the partition untouched.
    async fn upsert(&self, partition: &str, items: Vec<IndexItem>) -> Result<()>;

    /// At most `limit` items by descending score, earlier insertion first on ties.
    async fn query(&self, partition: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredItem>>;

    async fn list_partitions(&self) -> Result<Vec<String>>;

    async fn item_count(&self, partition: &str) -> Result<usize>;

    /// Query every partition independently and merge by score.
    ///
    /// A partition whose query fails is logged and skipped; if all of them
    /// fail the result is empty rather than an error.
    async fn query_all(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredItem>> {
        let mut names = self.list_partitions().await?;
        names.sort();
        let lookups = names.iter().map(|name| async move { (name, self.query(name, vector, limit).await) });
        let outcomes = futures::future::join_all(lookups).await;

        let mut per_partition = Vec::with_capacity(outcomes.len());
        for (name, outcome) in outcomes {
            match outcome {
                Ok(hits) => per_partition.push(hits),
                Err(e) => warn!(partition = %name, error = %e, "skipping partition in global search"),
            }
        }
        let merged = merge_ranked(per_partition, limit);
        debug!(partitions = names.len(), hits = merged.len(), "global search merged");
        Ok(merged)
    }
}
