use indexmap::IndexMap;
use std::hash::Hash;

use crate::assign::PartitionAssignment;
use crate::types::PartitionId;

/// Size imbalance across partitions.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionSkew {
    /// Rows assigned across all partitions.
    pub total: usize,
    /// Number of partitions.
    pub partitions: usize,
    /// Smallest partition size.
    pub min: usize,
    /// Largest partition size.
    pub max: usize,
    /// Mean partition size.
    pub mean: f64,
    /// Largest partition's share of `total`.
    pub max_share: f64,
    /// Smallest partition's share of `total`.
    pub min_share: f64,
    /// `max / min`; infinite when some partition is empty.
    pub ratio: f64,
    /// Per-partition sizes, largest first.
    pub per_partition: Vec<PartitionShare>,
}

/// One partition's share of all assigned rows.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionShare {
    /// Partition the entry describes.
    pub partition_id: PartitionId,
    /// Rows in the partition.
    pub count: usize,
    /// `count / total`.
    pub share: f64,
}

/// Compute skew metrics over partition sizes.
/// `per_partition` is sorted largest first, ties by partition id.
pub fn partition_skew<L>(assignment: &PartitionAssignment<L>) -> Option<PartitionSkew> {
    let counts: Vec<usize> = assignment.iter().map(|(_, rows)| rows.len()).collect();
    if counts.is_empty() {
        return None;
    }
    let total: usize = counts.iter().sum();
    let partitions = counts.len();
    let min = counts.iter().copied().min().unwrap_or(0);
    let max = counts.iter().copied().max().unwrap_or(0);
    let share_of = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };
    let ratio = if min == 0 {
        f64::INFINITY
    } else {
        max as f64 / min as f64
    };
    let mut per_partition: Vec<PartitionShare> = counts
        .iter()
        .enumerate()
        .map(|(partition_id, &count)| PartitionShare {
            partition_id,
            count,
            share: share_of(count),
        })
        .collect();
    per_partition.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.partition_id.cmp(&b.partition_id))
    });
    Some(PartitionSkew {
        total,
        partitions,
        min,
        max,
        mean: total as f64 / partitions as f64,
        max_share: share_of(max),
        min_share: share_of(min),
        ratio,
        per_partition,
    })
}

/// Per-partition label counts. `row_labels[i]` is the label of row `i`.
///
/// Each map lists labels in ascending order and omits labels the partition
/// does not hold.
pub fn label_composition<L>(
    assignment: &PartitionAssignment<L>,
    row_labels: &[L],
) -> Vec<IndexMap<L, usize>>
where
    L: Clone + Ord + Hash,
{
    assignment
        .iter()
        .map(|(_, rows)| {
            let mut counts: IndexMap<L, usize> = IndexMap::new();
            for &row in rows {
                if let Some(label) = row_labels.get(row) {
                    *counts.entry(label.clone()).or_default() += 1;
                }
            }
            counts.sort_keys();
            counts
        })
        .collect()
}
