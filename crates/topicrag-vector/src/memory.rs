//! Exact brute-force index held in process memory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

use topicrag_core::ranking::rank_partition;
use topicrag_core::{check_partition_name, Error, IndexItem, ItemId, Meta, Result, ScoredItem, VectorIndex};

use crate::similarity::cosine;

struct Stored {
    vector: Vec<f32>,
    text: String,
    metadata: Meta,
    seq: u64,
}

struct Partition {
    dim: usize,
    items: HashMap<ItemId, Stored>,
}

#[derive(Default)]
pub struct InMemoryIndex {
    partitions: RwLock<HashMap<String, Partition>>,
    // shared by all partitions; bumped only under the write lock
    next_seq: AtomicU64,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn ensure_partition(&self, name: &str, dimension: usize) -> Result<()> {
        check_partition_name(name)?;
        let mut partitions = self.partitions.write().await;
        match partitions.get(name) {
            Some(p) if p.dim != dimension => Err(Error::DimensionMismatch {
                partition: name.to_string(),
                existing: p.dim,
                requested: dimension,
            }),
            Some(_) => Ok(()),
            None => {
                partitions.insert(name.to_string(), Partition { dim: dimension, items: HashMap::new() });
                info!(partition = name, dimension, "created partition");
                Ok(())
            }
        }
    }

    async fn upsert(&self, partition: &str, items: Vec<IndexItem>) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        let p = partitions
            .get_mut(partition)
            .ok_or_else(|| Error::UnknownPartition(partition.to_string()))?;
        if let Some(bad) = items.iter().find(|item| item.vector.len() != p.dim) {
            return Err(Error::VectorDimensionError {
                partition: partition.to_string(),
                expected: p.dim,
                actual: bad.vector.len(),
            });
        }
        let count = items.len();
        for item in items {
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            p.items.insert(item.id, Stored { vector: item.vector, text: item.text, metadata: item.metadata, seq });
        }
        debug!(partition, items = count, "upserted");
        Ok(())
    }

    async fn query(&self, partition: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredItem>> {
        let partitions = self.partitions.read().await;
        let p = partitions
            .get(partition)
            .ok_or_else(|| Error::UnknownPartition(partition.to_string()))?;
        if vector.len() != p.dim {
            return Err(Error::VectorDimensionError {
                partition: partition.to_string(),
                expected: p.dim,
                actual: vector.len(),
            });
        }
        let hits = p
            .items
            .iter()
            .map(|(id, stored)| ScoredItem {
                id: id.clone(),
                text: stored.text.clone(),
                score: cosine(vector, &stored.vector),
                metadata: stored.metadata.clone(),
                partition: partition.to_string(),
                seq: stored.seq,
            })
            .collect();
        Ok(rank_partition(hits, limit))
    }

    async fn list_partitions(&self) -> Result<Vec<String>> {
        Ok(self.partitions.read().await.keys().cloned().collect())
    }

    async fn item_count(&self, partition: &str) -> Result<usize> {
        self.partitions
            .read()
            .await
            .get(partition)
            .map(|p| p.items.len())
            .ok_or_else(|| Error::UnknownPartition(partition.to_string()))
    }
}
