//! Arrow layout of a topic table and conversions to and from it.

use anyhow::{anyhow, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, StringArray, TimestampMillisecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::Utc;
use std::sync::Arc;

use topicrag_core::{IndexItem, Meta, ScoredItem};

pub const ID: &str = "id";
pub const SEQ: &str = "seq";
pub const TEXT: &str = "text";
pub const METADATA: &str = "metadata";
pub const VECTOR: &str = "vector";
pub const INGESTED_AT: &str = "ingested_at";
pub const DISTANCE: &str = "_distance";

pub fn build_partition_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(ID, DataType::Utf8, false),
        Field::new(SEQ, DataType::Int64, false),
        Field::new(TEXT, DataType::Utf8, false),
        Field::new(METADATA, DataType::Utf8, false),
        Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
        Field::new(INGESTED_AT, DataType::Timestamp(TimeUnit::Millisecond, None), false),
    ]))
}

/// Dimension of the `vector` column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR).ok()?.data_type() {
        DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
        _ => None,
    }
}

/// Rows for `items`, numbered from `first_seq` in slice order.
pub fn items_to_batch(items: &[IndexItem], first_seq: u64, dim: i32) -> Result<RecordBatch> {
    let now = Utc::now().timestamp_millis();
    let mut ids = Vec::with_capacity(items.len());
    let mut seqs = Vec::with_capacity(items.len());
    let mut texts = Vec::with_capacity(items.len());
    let mut metadata = Vec::with_capacity(items.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(items.len());
    for (offset, item) in (0u64..).zip(items) {
        ids.push(item.id.clone());
        seqs.push(i64::try_from(first_seq + offset)?);
        texts.push(item.text.clone());
        metadata.push(serde_json::to_string(&item.metadata)?);
        vectors.push(Some(item.vector.iter().map(|&x| Some(x)).collect()));
    }
    let batch = RecordBatch::try_new(
        build_partition_schema(dim),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(Int64Array::from(seqs)),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(metadata)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                vectors.into_iter(),
                dim,
            )),
            Arc::new(TimestampMillisecondArray::from(vec![now; items.len()])),
        ],
    )?;
    Ok(batch)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("column '{name}' missing or mistyped"))
}

/// Decode a vector-search result batch. Score is `1 - cosine distance`.
pub fn batch_to_hits(batch: &RecordBatch, partition: &str) -> Result<Vec<ScoredItem>> {
    let ids = column::<StringArray>(batch, ID)?;
    let seqs = column::<Int64Array>(batch, SEQ)?;
    let texts = column::<StringArray>(batch, TEXT)?;
    let metadata = column::<StringArray>(batch, METADATA)?;
    let distances = column::<Float32Array>(batch, DISTANCE)?;
    let mut hits = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let meta: Meta = serde_json::from_str(metadata.value(i))?;
        hits.push(ScoredItem {
            id: ids.value(i).to_string(),
            text: texts.value(i).to_string(),
            score: 1.0 - distances.value(i),
            metadata: meta,
            partition: partition.to_string(),
            seq: u64::try_from(seqs.value(i))?,
        });
    }
    Ok(hits)
}

/// Largest `seq` in a batch that only needs the `seq` column.
pub fn max_seq(batch: &RecordBatch) -> Result<Option<u64>> {
    let seqs = column::<Int64Array>(batch, SEQ)?;
    let max = seqs.iter().flatten().max();
    Ok(max.map(u64::try_from).transpose()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_reports_its_dimension() {
        assert_eq!(vector_dim(&build_partition_schema(7)), Some(7));
        assert_eq!(vector_dim(&Schema::empty()), None);
    }

    #[test]
    fn batch_numbers_rows_from_first_seq() {
        let items: Vec<IndexItem> = (0..3)
            .map(|i| IndexItem {
                id: format!("f.txt:{i}"),
                vector: vec![i as f32, 1.0],
                text: format!("chunk {i}"),
                metadata: Meta::from([("filename".to_string(), "f.txt".to_string())]),
            })
            .collect();
        let batch = items_to_batch(&items, 10, 2).expect("batch");
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(max_seq(&batch).expect("seq column"), Some(12));
    }
}
