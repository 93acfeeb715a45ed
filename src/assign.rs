//! Rotation-based label ownership and slot consumption.
//!
//! Partition `p` owns the labels at positions `p, p+1, ..., p+k-1` (mod the
//! label count) of the ascending label order, where `k` is
//! `num_unique_labels_per_partition`. Consecutive partitions therefore share
//! `k-1` labels, giving the pathological non-IID split. Every time a
//! partition takes a label it consumes that label's next unused slot.

use std::fmt::Debug;
use std::hash::Hash;
use tracing::warn;

use crate::errors::PartitionError;
use crate::indexer::LabelIndex;
use crate::matrix::SamplingMatrix;
use crate::types::{PartitionId, RowIndex, SampleCount, SlotIndex};

/// One (label, slot) pair consumed by a partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotClaim {
    /// Position of the label in ascending label order.
    pub label_pos: usize,
    /// Slot of that label consumed by the partition.
    pub slot: SlotIndex,
}

/// Per-label cursor over slots. Starts at zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotTracker {
    cursors: Vec<SlotIndex>,
}

impl SlotTracker {
    /// Tracker for `num_labels` labels.
    pub fn new(num_labels: usize) -> Self {
        Self {
            cursors: vec![0; num_labels],
        }
    }

    /// Return the next unused slot of `label_pos` and advance its cursor.
    pub fn claim(&mut self, label_pos: usize) -> SlotIndex {
        let slot = self.cursors[label_pos];
        self.cursors[label_pos] += 1;
        slot
    }

    /// Slots consumed so far per label.
    pub fn consumed(&self) -> &[SlotIndex] {
        &self.cursors
    }
}

/// Label positions owned by `partition_id` under the rotation.
pub fn owned_label_positions(
    partition_id: PartitionId,
    num_labels: usize,
    num_unique_labels_per_partition: usize,
) -> Vec<usize> {
    if num_labels == 0 {
        return Vec::new();
    }
    (0..num_unique_labels_per_partition.min(num_labels))
        .map(|offset| (partition_id + offset) % num_labels)
        .collect()
}

/// How many partitions take each label under the rotation.
pub fn rotation_demand(
    num_partitions: usize,
    num_labels: usize,
    num_unique_labels_per_partition: usize,
) -> Vec<usize> {
    let mut demand = vec![0usize; num_labels];
    for partition_id in 0..num_partitions {
        let owned =
            owned_label_positions(partition_id, num_labels, num_unique_labels_per_partition);
        for pos in owned {
            demand[pos] += 1;
        }
    }
    demand
}

/// Reject rotations that would consume more slots of a label than exist.
pub fn validate_rotation(
    num_partitions: usize,
    num_labels: usize,
    num_unique_labels_per_partition: usize,
    slots_per_label: usize,
) -> Result<(), PartitionError> {
    let demand = rotation_demand(num_partitions, num_labels, num_unique_labels_per_partition);
    if let Some((pos, taken)) = demand
        .iter()
        .enumerate()
        .find(|(_, taken)| **taken > slots_per_label)
    {
        return Err(PartitionError::Shape(format!(
            "label rotation assigns label position {pos} to {taken} partitions but only {slots_per_label} slots exist"
        )));
    }
    Ok(())
}

/// Partition id → row indices, with the data used to derive it.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionAssignment<L> {
    labels: Vec<L>,
    sampling: SamplingMatrix,
    partitions: Vec<Vec<RowIndex>>,
    claims: Vec<Vec<SlotClaim>>,
    unassigned: usize,
}

impl<L> PartitionAssignment<L> {
    /// Number of partitions.
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Row indices of `partition_id`.
    pub fn indices(&self, partition_id: PartitionId) -> Result<&[RowIndex], PartitionError> {
        self.partitions
            .get(partition_id)
            .map(Vec::as_slice)
            .ok_or(PartitionError::Lookup {
                partition_id,
                num_partitions: self.partitions.len(),
            })
    }

    /// Slots consumed by `partition_id`, in consumption order.
    pub fn claims(&self, partition_id: PartitionId) -> Result<&[SlotClaim], PartitionError> {
        self.claims
            .get(partition_id)
            .map(Vec::as_slice)
            .ok_or(PartitionError::Lookup {
                partition_id,
                num_partitions: self.claims.len(),
            })
    }

    /// Labels owned by `partition_id`.
    pub fn owned_labels(&self, partition_id: PartitionId) -> Result<Vec<&L>, PartitionError> {
        Ok(self
            .claims(partition_id)?
            .iter()
            .map(|claim| &self.labels[claim.label_pos])
            .collect())
    }

    /// Sum of the sampling entries for the slots `partition_id` consumes.
    pub fn expected_len(&self, partition_id: PartitionId) -> Result<SampleCount, PartitionError> {
        Ok(self
            .claims(partition_id)?
            .iter()
            .filter_map(|claim| self.sampling.get(claim.label_pos, claim.slot))
            .fold(0, |acc: SampleCount, count| acc.saturating_add(count)))
    }

    /// Distinct labels in ascending order (sampling-matrix row order).
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Resolved per-(label, slot) counts.
    pub fn sampling_matrix(&self) -> &SamplingMatrix {
        &self.sampling
    }

    /// Rows not placed in any partition.
    pub fn unassigned(&self) -> usize {
        self.unassigned
    }

    /// Rows placed in some partition.
    pub fn total_assigned(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    /// `(partition_id, indices)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PartitionId, &[RowIndex])> {
        self.partitions
            .iter()
            .enumerate()
            .map(|(id, rows)| (id, rows.as_slice()))
    }

    pub(crate) fn partitions_mut(&mut self) -> &mut [Vec<RowIndex>] {
        &mut self.partitions
    }
}

/// Walks partitions in id order, handing each its rotated labels' next slots.
pub struct PartitionAssigner<'a, L: Hash + Eq> {
    index: &'a LabelIndex<L>,
    sampling: &'a SamplingMatrix,
    num_unique_labels_per_partition: usize,
}

impl<'a, L> PartitionAssigner<'a, L>
where
    L: Clone + Ord + Hash + Debug,
{
    /// Assigner over a label index and its resolved sampling matrix.
    pub fn new(
        index: &'a LabelIndex<L>,
        sampling: &'a SamplingMatrix,
        num_unique_labels_per_partition: usize,
    ) -> Self {
        Self {
            index,
            sampling,
            num_unique_labels_per_partition,
        }
    }

    /// Produce the unshuffled assignment for `num_partitions` partitions.
    pub fn assign(&self, num_partitions: usize) -> Result<PartitionAssignment<L>, PartitionError> {
        let num_labels = self.index.len();
        let (rows, slots) = self.sampling.shape();
        if rows != num_labels {
            return Err(PartitionError::Configuration(format!(
                "sampling matrix has {rows} label rows but the dataset has {num_labels} labels"
            )));
        }
        let chunks = self.slice_chunks();

        let mut tracker = SlotTracker::new(num_labels);
        let mut partitions = Vec::with_capacity(num_partitions);
        let mut claims = Vec::with_capacity(num_partitions);
        for partition_id in 0..num_partitions {
            let mut indices = Vec::new();
            let mut taken = Vec::with_capacity(self.num_unique_labels_per_partition);
            let owned = owned_label_positions(
                partition_id,
                num_labels,
                self.num_unique_labels_per_partition,
            );
            for label_pos in owned {
                let slot = tracker.claim(label_pos);
                if slot >= slots {
                    return Err(PartitionError::Shape(format!(
                        "partition {partition_id} needs slot {slot} of label position {label_pos}, only {slots} exist"
                    )));
                }
                indices.extend_from_slice(chunks[label_pos][slot]);
                taken.push(SlotClaim { label_pos, slot });
            }
            partitions.push(indices);
            claims.push(taken);
        }

        let assigned: usize = partitions.iter().map(Vec::len).sum();
        let total_rows: usize = self.index.counts().iter().sum();
        Ok(PartitionAssignment {
            labels: self.index.labels().cloned().collect(),
            sampling: self.sampling.clone(),
            partitions,
            claims,
            unassigned: total_rows.saturating_sub(assigned),
        })
    }

    /// Per label, the row slice of every slot (cumulative-sum boundaries).
    fn slice_chunks(&self) -> Vec<Vec<&'a [RowIndex]>> {
        (0..self.index.len())
            .map(|label_pos| {
                let rows = self.index.rows_at(label_pos).unwrap_or(&[]);
                let requested = self.sampling.row_sum(label_pos);
                if requested > rows.len() {
                    warn!(
                        label_pos,
                        requested,
                        available = rows.len(),
                        "sampling row requests more samples than the label holds; trailing slots are truncated"
                    );
                }
                let mut start = 0usize;
                self.sampling
                    .row(label_pos)
                    .iter()
                    .map(|&count| {
                        let begin = start.min(rows.len());
                        start = start.saturating_add(count);
                        let end = start.min(rows.len());
                        &rows[begin..end]
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_label_index() -> LabelIndex<u8> {
        LabelIndex::from_groups([(0u8, (0..10).collect()), (1u8, (10..20).collect())])
    }

    #[test]
    fn rotation_shifts_by_partition_id() {
        assert_eq!(owned_label_positions(0, 4, 2), vec![0, 1]);
        assert_eq!(owned_label_positions(3, 4, 2), vec![3, 0]);
        assert_eq!(owned_label_positions(5, 4, 3), vec![1, 2, 3]);
    }

    #[test]
    fn rotation_demand_counts_owners() {
        assert_eq!(rotation_demand(4, 2, 1), vec![2, 2]);
        assert_eq!(rotation_demand(2, 4, 2), vec![1, 2, 1, 0]);
    }

    #[test]
    fn validate_rotation_rejects_over_consumption() {
        // 2 partitions x 2 labels over 4 labels: one slot per label, label 1 taken twice.
        assert!(validate_rotation(2, 4, 2, 1).is_err());
        assert!(validate_rotation(4, 2, 1, 2).is_ok());
    }

    #[test]
    fn slot_tracker_advances_per_label() {
        let mut tracker = SlotTracker::new(2);
        assert_eq!(tracker.claim(1), 0);
        assert_eq!(tracker.claim(1), 1);
        assert_eq!(tracker.claim(0), 0);
        assert_eq!(tracker.consumed(), &[1, 2]);
    }

    #[test]
    fn assigns_consecutive_chunks_per_label() {
        let index = two_label_index();
        let sampling = SamplingMatrix::from_rows(vec![vec![3, 7], vec![5, 5]]).unwrap();
        let assignment = PartitionAssigner::new(&index, &sampling, 1).assign(4).unwrap();
        assert_eq!(assignment.indices(0).unwrap(), &[0, 1, 2]);
        assert_eq!(assignment.indices(1).unwrap(), &[10, 11, 12, 13, 14]);
        assert_eq!(assignment.indices(2).unwrap(), &[3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(assignment.indices(3).unwrap(), &[15, 16, 17, 18, 19]);
        assert_eq!(assignment.unassigned(), 0);
        assert_eq!(assignment.owned_labels(2).unwrap(), vec![&0u8]);
    }

    #[test]
    fn two_labels_per_partition_concatenates_label_blocks() {
        let index = two_label_index();
        let sampling = SamplingMatrix::from_rows(vec![vec![4, 4], vec![2, 2]]).unwrap();
        let assignment = PartitionAssigner::new(&index, &sampling, 2).assign(2).unwrap();
        assert_eq!(assignment.indices(0).unwrap(), &[0, 1, 2, 3, 10, 11]);
        assert_eq!(assignment.indices(1).unwrap(), &[12, 13, 4, 5, 6, 7]);
        assert_eq!(assignment.expected_len(1).unwrap(), 6);
        assert_eq!(assignment.unassigned(), 8);
    }

    #[test]
    fn oversized_rows_are_truncated_to_available_indices() {
        let index = two_label_index();
        let sampling = SamplingMatrix::from_rows(vec![vec![8, 8], vec![1, 1]]).unwrap();
        let assignment = PartitionAssigner::new(&index, &sampling, 1).assign(4).unwrap();
        assert_eq!(assignment.indices(0).unwrap().len(), 8);
        assert_eq!(assignment.indices(2).unwrap(), &[8, 9]);
    }

    #[test]
    fn out_of_range_partition_is_a_lookup_error() {
        let index = two_label_index();
        let sampling = SamplingMatrix::from_rows(vec![vec![5, 5], vec![5, 5]]).unwrap();
        let assignment = PartitionAssigner::new(&index, &sampling, 1).assign(4).unwrap();
        assert!(matches!(
            assignment.indices(4).unwrap_err(),
            PartitionError::Lookup {
                partition_id: 4,
                num_partitions: 4
            }
        ));
    }
}
