//! Deterministic ordering of scored hits.
//!
//! Hits order by score descending, then by insertion sequence ascending.
//! Sequences are index-wide, so the same rule holds within a partition and
//! across a merge.

use std::cmp::Ordering;

use crate::types::ScoredItem;

pub fn compare_hits(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.seq.cmp(&b.seq))
}

/// Sort one partition's hits and keep the best `limit`.
pub fn rank_partition(mut hits: Vec<ScoredItem>, limit: usize) -> Vec<ScoredItem> {
    hits.sort_by(compare_hits);
    hits.truncate(limit);
    hits
}

/// Concatenate per-partition lists, re-sort the union by score and truncate.
pub fn merge_ranked(per_partition: Vec<Vec<ScoredItem>>, limit: usize) -> Vec<ScoredItem> {
    let mut all: Vec<ScoredItem> = per_partition.into_iter().flatten().collect();
    all.sort_by(compare_hits);
    all.truncate(limit);
    all
}
