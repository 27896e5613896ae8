//! LanceDB-backed index: one table per topic under a single database URI.

use anyhow::anyhow;
use arrow_array::RecordBatchIterator;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::table::Table;
use lancedb::{connect, Connection, DistanceType};
use tokio::sync::Mutex;
use tracing::{debug, info};

use topicrag_core::ranking::rank_partition;
use topicrag_core::{check_partition_name, Error, IndexItem, Result, ScoredItem, VectorIndex};

use crate::schema::{batch_to_hits, build_partition_schema, items_to_batch, max_seq, vector_dim, SEQ, VECTOR};

// candidates fetched beyond `limit` so equal scores at the cut can be
// re-ordered by insertion sequence
const TIE_MARGIN: usize = 8;

pub struct LanceIndex {
    db: Connection,
    // next index-wide insertion sequence, loaded on first write; also
    // serializes writers
    next_seq: Mutex<Option<u64>>,
}

impl LanceIndex {
    pub async fn open(uri: &str) -> anyhow::Result<Self> {
        let db = connect(uri).execute().await?;
        info!(uri, "opened lancedb");
        Ok(Self { db, next_seq: Mutex::new(None) })
    }

    async fn table(&self, partition: &str) -> Result<Table> {
        match self.db.open_table(partition).execute().await {
            Ok(table) => Ok(table),
            Err(lancedb::Error::TableNotFound { .. }) => Err(Error::UnknownPartition(partition.to_string())),
            Err(e) => Err(Error::backend(e)),
        }
    }

    async fn dimension(&self, partition: &str, table: &Table) -> Result<usize> {
        let schema = table.schema().await.map_err(Error::backend)?;
        vector_dim(&schema).ok_or_else(|| Error::backend(anyhow!("table '{partition}' has no vector column")))
    }

    /// One past the largest `seq` stored in any table.
    async fn scan_next_seq(&self) -> Result<u64> {
        let names = self.db.table_names().execute().await.map_err(Error::backend)?;
        let mut next = 0u64;
        for name in names {
            let table = self.table(&name).await?;
            let mut stream = table
                .query()
                .select(Select::columns(&[SEQ]))
                .execute()
                .await
                .map_err(Error::backend)?;
            while let Some(batch) = stream.try_next().await.map_err(Error::backend)? {
                if let Some(max) = max_seq(&batch).map_err(Error::Backend)? {
                    next = next.max(max + 1);
                }
            }
        }
        Ok(next)
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn ensure_partition(&self, name: &str, dimension: usize) -> Result<()> {
        check_partition_name(name)?;
        let dim = i32::try_from(dimension).map_err(Error::backend)?;
        let existing = self.db.table_names().execute().await.map_err(Error::backend)?;
        if !existing.iter().any(|n| n == name) {
            let schema = build_partition_schema(dim);
            let empty = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
            match self.db.create_table(name, Box::new(empty)).execute().await {
                Ok(_) => info!(partition = name, dimension, "created partition"),
                // lost a creation race; the winner's dimension is checked below
                Err(lancedb::Error::TableAlreadyExists { .. }) => {}
                Err(e) => return Err(Error::backend(e)),
            }
        }
        let table = self.table(name).await?;
        let existing = self.dimension(name, &table).await?;
        if existing != dimension {
            return Err(Error::DimensionMismatch { partition: name.to_string(), existing, requested: dimension });
        }
        Ok(())
    }

    async fn upsert(&self, partition: &str, items: Vec<IndexItem>) -> Result<()> {
        let table = self.table(partition).await?;
        let dim = self.dimension(partition, &table).await?;
        if let Some(bad) = items.iter().find(|item| item.vector.len() != dim) {
            return Err(Error::VectorDimensionError {
                partition: partition.to_string(),
                expected: dim,
                actual: bad.vector.len(),
            });
        }
        if items.is_empty() {
            return Ok(());
        }

        let mut next_seq = self.next_seq.lock().await;
        let first_seq = match *next_seq {
            Some(seq) => seq,
            None => self.scan_next_seq().await?,
        };
        let dim_i32 = i32::try_from(dim).map_err(Error::backend)?;
        let batch = items_to_batch(&items, first_seq, dim_i32).map_err(Error::Backend)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let mut merge = table.merge_insert(&["id"]);
        merge.when_matched_update_all(None).when_not_matched_insert_all();
        merge.execute(reader).await.map_err(Error::backend)?;
        *next_seq = Some(first_seq + items.len() as u64);
        debug!(partition, items = items.len(), first_seq, "upserted");
        Ok(())
    }

    async fn query(&self, partition: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredItem>> {
        let table = self.table(partition).await?;
        let dim = self.dimension(partition, &table).await?;
        if vector.len() != dim {
            return Err(Error::VectorDimensionError {
                partition: partition.to_string(),
                expected: dim,
                actual: vector.len(),
            });
        }
        let rows = table.count_rows(None).await.map_err(Error::backend)?;
        // never ask the engine for more rows than the table holds
        let candidates = limit.saturating_add(TIE_MARGIN).min(rows);
        if limit == 0 || candidates == 0 {
            return Ok(Vec::new());
        }
        let mut stream = table
            .vector_search(vector.to_vec())
            .map_err(Error::backend)?
            .column(VECTOR)
            .distance_type(DistanceType::Cosine)
            .limit(candidates)
            .execute()
            .await
            .map_err(Error::backend)?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::backend)? {
            hits.extend(batch_to_hits(&batch, partition).map_err(Error::Backend)?);
        }
        debug!(partition, candidates = hits.len(), limit, "vector search");
        Ok(rank_partition(hits, limit))
    }

    async fn list_partitions(&self) -> Result<Vec<String>> {
        self.db.table_names().execute().await.map_err(Error::backend)
    }

    async fn item_count(&self, partition: &str) -> Result<usize> {
        let table = self.table(partition).await?;
        table.count_rows(None).await.map_err(Error::backend)
    }
}
