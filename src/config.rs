use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::config::{
    DEFAULT_PARTITION_BY, DEFAULT_PREASSIGNED_NUM_SAMPLES_PER_LABEL, DEFAULT_RESCALE,
    DEFAULT_SEED, DEFAULT_SHUFFLE,
};
use crate::errors::PartitionError;
use crate::matrix::DistributionMatrix;
use crate::types::ColumnName;

/// What happens to samples lost to floor rounding when rescaling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Leave the rounding remainder unassigned (the historical behavior).
    #[default]
    Drop,
    /// Hand the remainder out one sample at a time to the slots with the
    /// largest fractional parts, so each label row sums to its true count.
    Pad,
}

/// Configuration of a [`crate::DistributionPartitioner`].
///
/// Frozen once the partitioner is built; rescaling never mutates
/// `distribution_array`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartitionerConfig {
    /// Per-label (rows) by per-slot (columns) target counts or weights.
    ///
    /// Column count must equal
    /// `num_unique_labels_per_partition * num_partitions / rows`.
    pub distribution_array: DistributionMatrix,
    /// Number of partitions to produce.
    pub num_partitions: usize,
    /// Number of distinct labels each partition receives.
    pub num_unique_labels_per_partition: usize,
    /// Label column name.
    #[serde(default = "default_partition_by")]
    pub partition_by: ColumnName,
    /// Minimum number of samples every (label, slot) pair receives.
    #[serde(default = "default_preassigned")]
    pub preassigned_num_samples_per_label: usize,
    /// Treat `distribution_array` as weights and rescale them against the
    /// dataset's label counts. When false the cells are exact counts.
    #[serde(default = "default_rescale")]
    pub rescale: bool,
    /// Shuffle the order of indices inside each partition.
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    /// Seed for the shuffle generator. Ignored when `shuffle` is false.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Handling of the floor-rounding remainder in rescale mode.
    #[serde(default)]
    pub remainder_policy: RemainderPolicy,
}

impl PartitionerConfig {
    /// Config with the required fields set and defaults elsewhere.
    pub fn new(
        distribution_array: DistributionMatrix,
        num_partitions: usize,
        num_unique_labels_per_partition: usize,
    ) -> Self {
        Self {
            distribution_array,
            num_partitions,
            num_unique_labels_per_partition,
            partition_by: default_partition_by(),
            preassigned_num_samples_per_label: DEFAULT_PREASSIGNED_NUM_SAMPLES_PER_LABEL,
            rescale: DEFAULT_RESCALE,
            shuffle: DEFAULT_SHUFFLE,
            seed: DEFAULT_SEED,
            remainder_policy: RemainderPolicy::default(),
        }
    }

    /// Load a JSON config file.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, PartitionError> {
        let raw = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Number of distinct labels, inferred from the distribution rows.
    pub fn num_unique_labels(&self) -> usize {
        self.distribution_array.num_rows()
    }
}

fn default_partition_by() -> ColumnName {
    DEFAULT_PARTITION_BY.to_string()
}

fn default_preassigned() -> usize {
    DEFAULT_PREASSIGNED_NUM_SAMPLES_PER_LABEL
}

fn default_rescale() -> bool {
    DEFAULT_RESCALE
}

fn default_shuffle() -> bool {
    DEFAULT_SHUFFLE
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults_match_constructor_defaults() {
        let raw = r#"{
            "distribution_array": [[1, 1], [1, 1]],
            "num_partitions": 4,
            "num_unique_labels_per_partition": 1
        }"#;
        let parsed: PartitionerConfig = serde_json::from_str(raw).unwrap();
        let built = PartitionerConfig::new(DistributionMatrix::filled(2, 2, 1.0), 4, 1);
        assert_eq!(parsed, built);
        assert_eq!(parsed.seed, 42);
        assert!(parsed.rescale);
        assert!(parsed.shuffle);
        assert_eq!(parsed.partition_by, "label");
        assert_eq!(parsed.num_unique_labels(), 2);
    }

    #[test]
    fn remainder_policy_parses_snake_case() {
        let raw = r#"{
            "distribution_array": [[1]],
            "num_partitions": 1,
            "num_unique_labels_per_partition": 1,
            "remainder_policy": "pad"
        }"#;
        let parsed: PartitionerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.remainder_policy, RemainderPolicy::Pad);
    }

    #[test]
    fn ragged_distribution_fails_to_parse() {
        let raw = r#"{
            "distribution_array": [[1, 2], [3]],
            "num_partitions": 1,
            "num_unique_labels_per_partition": 1
        }"#;
        assert!(serde_json::from_str::<PartitionerConfig>(raw).is_err());
    }
}
