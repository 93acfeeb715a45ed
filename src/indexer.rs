use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

use crate::dataset::LabeledDataset;
use crate::errors::PartitionError;
use crate::types::RowIndex;

/// Label → row indices carrying that label.
///
/// Keys are held in ascending label order; each index list keeps dataset
/// order. Built once per partitioner and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelIndex<L: Hash + Eq> {
    by_label: IndexMap<L, Vec<RowIndex>>,
}

impl<L> LabelIndex<L>
where
    L: Clone + Ord + Hash + Debug,
{
    /// Build the index for `column` of `dataset`.
    pub fn build<D>(dataset: &D, column: &str) -> Result<Self, PartitionError>
    where
        D: LabeledDataset<Label = L> + ?Sized,
    {
        let values = dataset.column_values(column)?;
        if values.len() != dataset.row_count() {
            return Err(PartitionError::Dataset {
                column: column.to_string(),
                reason: format!(
                    "column has {} values but the dataset has {} rows",
                    values.len(),
                    dataset.row_count()
                ),
            });
        }

        let distinct: BTreeSet<&L> = values.iter().collect();
        let mut by_label: IndexMap<L, Vec<RowIndex>> = distinct
            .into_iter()
            .map(|label| (label.clone(), Vec::new()))
            .collect();
        for (row, value) in values.iter().enumerate() {
            if let Some(rows) = by_label.get_mut(value) {
                rows.push(row);
            }
        }
        Ok(Self { by_label })
    }

    /// Construct directly from label groups (sorted here).
    pub fn from_groups(groups: impl IntoIterator<Item = (L, Vec<RowIndex>)>) -> Self {
        let mut by_label: IndexMap<L, Vec<RowIndex>> = groups.into_iter().collect();
        by_label.sort_keys();
        Self { by_label }
    }

    /// Distinct labels in ascending order.
    pub fn labels(&self) -> impl ExactSizeIterator<Item = &L> {
        self.by_label.keys()
    }

    /// Label at position `pos` of the ascending order.
    pub fn label_at(&self, pos: usize) -> Option<&L> {
        self.by_label.get_index(pos).map(|(label, _)| label)
    }

    /// Row indices for `label`, in dataset order.
    pub fn rows_for(&self, label: &L) -> Option<&[RowIndex]> {
        self.by_label.get(label).map(Vec::as_slice)
    }

    /// Row indices for the label at position `pos`.
    pub fn rows_at(&self, pos: usize) -> Option<&[RowIndex]> {
        self.by_label.get_index(pos).map(|(_, rows)| rows.as_slice())
    }

    /// Per-label row counts, aligned with [`LabelIndex::labels`].
    pub fn counts(&self) -> Vec<usize> {
        self.by_label.values().map(Vec::len).collect()
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    /// Whether no label was found.
    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{InMemoryDataset, LabelValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Labels `row % 3`; counts how often the label column is read.
    struct CountingDataset {
        rows: usize,
        reads: AtomicUsize,
    }

    impl LabeledDataset for CountingDataset {
        type Label = usize;
        type View = Vec<RowIndex>;

        fn column_values(&self, _column: &str) -> Result<Vec<usize>, PartitionError> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            Ok((0..self.rows).map(|row| row % 3).collect())
        }

        fn row_count(&self) -> usize {
            self.rows
        }

        fn select(&self, indices: &[RowIndex]) -> Result<Vec<RowIndex>, PartitionError> {
            Ok(indices.to_vec())
        }
    }

    #[test]
    fn build_reads_the_label_column_once() {
        let dataset = CountingDataset {
            rows: 9,
            reads: AtomicUsize::new(0),
        };
        let index = LabelIndex::build(&dataset, "label").unwrap();
        assert_eq!(dataset.reads.load(Ordering::Relaxed), 1);
        assert_eq!(index.labels().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(index.rows_at(1).unwrap(), &[1, 4, 7]);
    }

    #[test]
    fn groups_rows_by_label_in_dataset_order() {
        let dataset = InMemoryDataset::from_labels("label", [1, 0, 1, 2, 0]);
        let index = LabelIndex::build(&dataset, "label").unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.rows_for(&LabelValue::Int(0)).unwrap(), &[1, 4]);
        assert_eq!(index.rows_for(&LabelValue::Int(1)).unwrap(), &[0, 2]);
        assert_eq!(index.rows_for(&LabelValue::Int(2)).unwrap(), &[3]);
        assert_eq!(index.counts(), vec![2, 2, 1]);
    }

    #[test]
    fn labels_are_ascending() {
        let dataset = InMemoryDataset::from_labels("label", ["zebra", "ant", "moth"]);
        let index = LabelIndex::build(&dataset, "label").unwrap();
        let labels: Vec<String> = index.labels().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["ant", "moth", "zebra"]);
        assert_eq!(index.label_at(0), Some(&LabelValue::from("ant")));
        assert_eq!(index.rows_at(2).unwrap(), &[0]);
    }

    #[test]
    fn from_groups_sorts_keys() {
        let index = LabelIndex::from_groups([(2u8, vec![0]), (0u8, vec![1, 2])]);
        assert_eq!(index.labels().copied().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn missing_label_column_fails() {
        let dataset = InMemoryDataset::from_labels("label", [0]);
        assert!(LabelIndex::build(&dataset, "target").is_err());
    }
}
